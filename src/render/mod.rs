// src/render/mod.rs
mod fonts;
pub mod markup;
pub mod pdf;

pub use markup::to_display_markup;
pub use pdf::{to_document, write_document};
