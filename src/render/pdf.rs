// src/render/pdf.rs
//! Minimal PDF 1.4 writer for the exported digest.
//! Standard Type 1 fonts only (no embedding), WinAnsi text, A4 pages.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::DigestError;
use crate::ingest::types::Headline;
use crate::render::fonts::{text_width, win_ansi, Font};
use crate::render::markup::{inline_plain, parse_blocks, Block};

const PAGE_W: f32 = 595.0;
const PAGE_H: f32 = 842.0;
const MARGIN: f32 = 50.0;
const MAX_TITLE_CHARS: usize = 200;

/// Encode text as WinAnsi and escape it for a PDF literal string.
fn pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match win_ansi(ch) {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b @ b' '..=b'~' => out.push(char::from(b)),
            b => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }
    out
}

/// Greedy word wrap to `max_w` points; words wider than a line are hard-split.
fn wrap(text: &str, font: Font, size: f32, max_w: f32) -> Vec<String> {
    let fits = |s: &str| text_width(s, font, size) <= max_w;
    let mut lines = Vec::new();
    let mut cur = String::new();

    for word in text.split_whitespace() {
        let candidate = if cur.is_empty() {
            word.to_string()
        } else {
            format!("{cur} {word}")
        };
        if fits(&candidate) {
            cur = candidate;
            continue;
        }
        if !cur.is_empty() {
            lines.push(std::mem::take(&mut cur));
        }
        for ch in word.chars() {
            cur.push(ch);
            if !fits(&cur) && cur.chars().count() > 1 {
                cur.pop();
                lines.push(std::mem::replace(&mut cur, ch.to_string()));
            }
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let mut t: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
    t.push_str("...");
    t
}

/// Strip tags from a previously rendered HTML line.
fn strip_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for ch in line.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    html_escape::decode_html_entities(&out).trim().to_string()
}

/// Accumulates page content streams, breaking pages as the cursor runs out.
struct Layout {
    pages: Vec<String>,
    current: String,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: String::new(),
            y: PAGE_H - MARGIN,
        }
    }

    fn new_page(&mut self) {
        let done = std::mem::take(&mut self.current);
        self.pages.push(done);
        self.y = PAGE_H - MARGIN;
    }

    /// Vertical space; the next line breaks the page if needed.
    fn gap(&mut self, h: f32) {
        self.y -= h;
    }

    fn line(&mut self, text: &str, font: Font, size: f32, indent: f32) {
        let lead = size * 1.35;
        if self.y - lead < MARGIN {
            self.new_page();
        }
        self.y -= lead;
        let _ = writeln!(
            self.current,
            "BT {} {size:.1} Tf {:.2} {:.2} Td ({}) Tj ET",
            font.resource(),
            MARGIN + indent,
            self.y,
            pdf_string(text)
        );
    }

    /// Wrapped text; `prefix` goes on the first line, continuation lines align after it.
    fn text(&mut self, text: &str, font: Font, size: f32, indent: f32, prefix: &str) {
        let pad = text_width(prefix, font, size);
        let usable = PAGE_W - 2.0 * MARGIN - indent - pad;
        for (i, l) in wrap(text, font, size, usable).iter().enumerate() {
            if i == 0 {
                self.line(&format!("{prefix}{l}"), font, size, indent);
            } else {
                self.line(l, font, size, indent + pad);
            }
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.pages.push(self.current);
        self.pages
    }
}

fn layout_summary(lay: &mut Layout, summary: &str) {
    let blocks = parse_blocks(summary);
    if blocks.is_empty() {
        lay.text("No summary available.", Font::Regular, 11.0, 0.0, "");
        return;
    }
    for b in &blocks {
        match b {
            Block::Heading { level, content } => {
                let size = match level {
                    1 => 15.0,
                    2 => 13.0,
                    _ => 12.0,
                };
                lay.gap(6.0);
                lay.text(&inline_plain(content), Font::Bold, size, 0.0, "");
            }
            Block::Paragraph(content) => {
                lay.text(&inline_plain(content), Font::Regular, 11.0, 0.0, "");
                lay.gap(4.0);
            }
            Block::List(items) => {
                for it in items {
                    lay.text(&inline_plain(it), Font::Regular, 11.0, 12.0, "- ");
                }
                lay.gap(4.0);
            }
            Block::Rendered(html) => {
                let plain = strip_markup(html);
                if !plain.is_empty() {
                    lay.text(&plain, Font::Regular, 11.0, 0.0, "");
                }
            }
        }
    }
}

fn layout_headlines(lay: &mut Layout, headlines: &[Headline]) {
    if headlines.is_empty() {
        return;
    }
    lay.gap(12.0);
    lay.text("Headlines", Font::Bold, 14.0, 0.0, "");
    lay.gap(2.0);
    for h in headlines {
        lay.text(&truncate_title(&h.title), Font::Regular, 10.0, 0.0, "- ");
        let mut meta = h.source.clone();
        if h.published_at.timestamp() > 0 {
            if !meta.is_empty() {
                meta.push_str(" | ");
            }
            meta.push_str(&h.published_at.format("%Y-%m-%d %H:%M UTC").to_string());
        }
        if !meta.is_empty() {
            lay.text(&meta, Font::Regular, 8.5, 10.0, "");
        }
        lay.gap(2.0);
    }
}

/// Serialize page streams into a complete PDF file.
fn serialize(pages: &[String], generated_at: DateTime<Utc>) -> std::io::Result<Vec<u8>> {
    const FIXED: usize = 5; // catalog, pages, 2 fonts, info
    let total = FIXED + pages.len() * 2;
    let mut buf: Vec<u8> = Vec::new();
    let mut offsets = vec![0usize; total + 1];

    buf.write_all(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n")?;

    let page_id = |i: usize| FIXED + 1 + i * 2;
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect();

    let mut objects: Vec<(usize, String)> = vec![
        (1, "<< /Type /Catalog /Pages 2 0 R >>".to_string()),
        (
            2,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                pages.len()
            ),
        ),
        (
            3,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ),
        (
            4,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ),
        (
            5,
            format!(
                "<< /Title (Daily Market Digest) /Producer (market-digest) /CreationDate (D:{}Z) >>",
                generated_at.format("%Y%m%d%H%M%S")
            ),
        ),
    ];
    for (i, content) in pages.iter().enumerate() {
        let pid = page_id(i);
        objects.push((
            pid,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_W} {PAGE_H}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                pid + 1
            ),
        ));
        objects.push((
            pid + 1,
            format!(
                "<< /Length {} >>\nstream\n{content}\nendstream",
                content.len()
            ),
        ));
    }

    for (id, body) in &objects {
        offsets[*id] = buf.len();
        write!(buf, "{id} 0 obj\n{body}\nendobj\n")?;
    }

    let xref_at = buf.len();
    write!(buf, "xref\n0 {}\n0000000000 65535 f \n", total + 1)?;
    for off in &offsets[1..] {
        write!(buf, "{off:010} 00000 n \n")?;
    }
    write!(
        buf,
        "trailer\n<< /Size {} /Root 1 0 R /Info 5 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        total + 1
    )?;
    Ok(buf)
}

/// Lay out the summary and headline list at a fixed generation time.
pub fn to_document_at(
    summary: &str,
    headlines: &[Headline],
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, DigestError> {
    let mut lay = Layout::new();
    lay.text("Daily Market Digest", Font::Bold, 18.0, 0.0, "");
    lay.text(
        &format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
        Font::Regular,
        10.0,
        0.0,
        "",
    );
    lay.gap(10.0);

    layout_summary(&mut lay, summary);
    layout_headlines(&mut lay, headlines);

    serialize(&lay.finish(), generated_at).map_err(|e| DigestError::Export(e.to_string()))
}

/// Render the digest as PDF bytes.
pub fn to_document(summary: &str, headlines: &[Headline]) -> Result<Vec<u8>, DigestError> {
    to_document_at(summary, headlines, Utc::now())
}

/// Render and write to `path`.
pub fn write_document(
    path: &Path,
    summary: &str,
    headlines: &[Headline],
) -> Result<(), DigestError> {
    let bytes = to_document(summary, headlines)?;
    std::fs::write(path, bytes)
        .map_err(|e| DigestError::Export(format!("writing {}: {e}", path.display())))
}
