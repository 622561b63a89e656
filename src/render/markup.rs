// src/render/markup.rs
//! Markdown-subset → HTML via a line-classification state machine.
//!
//! Recognized: `#`/`##`/`###` headings, `- ` / `* ` bullets, `1. ` numbered lines,
//! `**strong**`, `*em*`.
//! Everything else becomes paragraph text. Lines that already look exactly like
//! this renderer's output are passed through, so rendering its own output is a no-op.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(String),
    Emphasis(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List(Vec<Vec<Inline>>),
    /// Previously rendered markup, emitted unchanged.
    Rendered(String),
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Heading(u8, &'a str),
    Bullet(&'a str),
    /// `1. item`; always opens a new paragraph.
    Numbered(&'a str),
    Rendered(&'a str),
    Text(&'a str),
}

enum State {
    None,
    InParagraph(Vec<String>),
    InList(Vec<Vec<Inline>>),
}

const BLOCK_TAGS: [&str; 5] = ["p", "h1", "h2", "h3", "li"];
const INLINE_TAGS: [&str; 4] = ["<strong>", "</strong>", "<em>", "</em>"];

/// Exactly the shapes `render_html` emits, with no markup inside besides strong/em.
fn is_rendered(line: &str) -> bool {
    if line == "<ul>" || line == "</ul>" {
        return true;
    }
    BLOCK_TAGS.iter().any(|tag| {
        let open = format!("<{tag}>");
        let close = format!("</{tag}>");
        line.strip_prefix(open.as_str())
            .and_then(|r| r.strip_suffix(close.as_str()))
            .is_some_and(|inner| {
                let stripped = INLINE_TAGS
                    .iter()
                    .fold(inner.to_string(), |acc, t| acc.replace(t, ""));
                !stripped.contains(['<', '>'])
            })
    })
}

fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if is_rendered(line) {
        return Line::Rendered(line);
    }

    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=3).contains(&hashes) {
        if let Some(rest) = line[hashes..].strip_prefix(' ') {
            let rest = rest.trim();
            if !rest.is_empty() {
                return Line::Heading(hashes as u8, rest);
            }
        }
    }

    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Line::Bullet(rest.trim());
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && line[digits..].starts_with(". ") {
        return Line::Numbered(line);
    }

    Line::Text(line)
}

/// Split one line of text into plain / strong / emphasis runs.
/// Unmatched markers stay literal.
pub fn parse_inline(s: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut rest = s;

    fn flush(buf: &mut String, out: &mut Vec<Inline>) {
        if !buf.is_empty() {
            out.push(Inline::Text(std::mem::take(buf)));
        }
    }

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**") {
            match after.find("**") {
                Some(end) if end > 0 => {
                    flush(&mut buf, &mut out);
                    out.push(Inline::Strong(after[..end].to_string()));
                    rest = &after[end + 2..];
                }
                _ => {
                    buf.push_str("**");
                    rest = after;
                }
            }
            continue;
        }

        if let Some(after) = rest.strip_prefix('*') {
            match after.find('*') {
                Some(end) if end > 0 && !after.starts_with(' ') => {
                    flush(&mut buf, &mut out);
                    out.push(Inline::Emphasis(after[..end].to_string()));
                    rest = &after[end + 1..];
                }
                _ => {
                    buf.push('*');
                    rest = after;
                }
            }
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        buf.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    flush(&mut buf, &mut out);
    out
}

fn close(state: State, blocks: &mut Vec<Block>) {
    match state {
        State::None => {}
        State::InParagraph(lines) => blocks.push(Block::Paragraph(parse_inline(&lines.join(" ")))),
        State::InList(items) => blocks.push(Block::List(items)),
    }
}

/// Consume the text line by line and emit block nodes.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut state = State::None;

    for raw in text.lines() {
        state = match (state, classify(raw)) {
            (State::InList(mut items), Line::Bullet(b)) => {
                items.push(parse_inline(b));
                State::InList(items)
            }
            (State::InParagraph(mut lines), Line::Text(t)) => {
                lines.push(t.to_string());
                State::InParagraph(lines)
            }
            (prev, line) => {
                close(prev, &mut blocks);
                match line {
                    Line::Blank => State::None,
                    Line::Heading(level, t) => {
                        blocks.push(Block::Heading {
                            level,
                            content: parse_inline(t),
                        });
                        State::None
                    }
                    Line::Rendered(r) => {
                        blocks.push(Block::Rendered(r.to_string()));
                        State::None
                    }
                    Line::Bullet(b) => State::InList(vec![parse_inline(b)]),
                    Line::Numbered(t) | Line::Text(t) => State::InParagraph(vec![t.to_string()]),
                }
            }
        };
    }
    close(state, &mut blocks);
    blocks
}

fn inline_html(runs: &[Inline]) -> String {
    let mut out = String::new();
    for r in runs {
        match r {
            Inline::Text(t) => out.push_str(&html_escape::encode_text(t)),
            Inline::Strong(t) => {
                out.push_str("<strong>");
                out.push_str(&html_escape::encode_text(t));
                out.push_str("</strong>");
            }
            Inline::Emphasis(t) => {
                out.push_str("<em>");
                out.push_str(&html_escape::encode_text(t));
                out.push_str("</em>");
            }
        }
    }
    out
}

/// Plain text of inline runs with markers dropped.
pub fn inline_plain(runs: &[Inline]) -> String {
    runs.iter()
        .map(|r| match r {
            Inline::Text(t) | Inline::Strong(t) | Inline::Emphasis(t) => t.as_str(),
        })
        .collect()
}

/// One block element per line; list items on their own lines.
pub fn render_html(blocks: &[Block]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for b in blocks {
        match b {
            Block::Heading { level, content } => {
                lines.push(format!("<h{level}>{}</h{level}>", inline_html(content)));
            }
            Block::Paragraph(content) => lines.push(format!("<p>{}</p>", inline_html(content))),
            Block::List(items) => {
                lines.push("<ul>".to_string());
                for it in items {
                    lines.push(format!("<li>{}</li>", inline_html(it)));
                }
                lines.push("</ul>".to_string());
            }
            Block::Rendered(r) => lines.push(r.clone()),
        }
    }
    lines.join("\n")
}

/// Best-effort display HTML for model output. Never fails.
pub fn to_display_markup(text: &str) -> String {
    render_html(&parse_blocks(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_lines() {
        assert_eq!(classify("   "), Line::Blank);
        assert_eq!(classify("## Risks"), Line::Heading(2, "Risks"));
        assert_eq!(classify("#### Too deep"), Line::Text("#### Too deep"));
        assert_eq!(classify("#NoSpace"), Line::Text("#NoSpace"));
        assert_eq!(classify("- item"), Line::Bullet("item"));
        assert_eq!(classify("* item"), Line::Bullet("item"));
        assert_eq!(classify("12. Oil"), Line::Numbered("12. Oil"));
        assert_eq!(classify("3.5% yield"), Line::Text("3.5% yield"));
        assert_eq!(classify("**bold**"), Line::Text("**bold**"));
        assert_eq!(classify("<p>ok</p>"), Line::Rendered("<p>ok</p>"));
        assert_eq!(
            classify("<p><script>x</script></p>"),
            Line::Text("<p><script>x</script></p>")
        );
    }

    #[test]
    fn inline_runs() {
        assert_eq!(
            parse_inline("a **b** *c* d"),
            vec![
                Inline::Text("a ".into()),
                Inline::Strong("b".into()),
                Inline::Text(" ".into()),
                Inline::Emphasis("c".into()),
                Inline::Text(" d".into()),
            ]
        );
        assert_eq!(
            parse_inline("2 * 3 = 6 **open"),
            vec![Inline::Text("2 * 3 = 6 **open".into())]
        );
    }

    #[test]
    fn consecutive_text_lines_form_one_paragraph() {
        let html = to_display_markup("line one\nline two\n\nnext");
        assert_eq!(html, "<p>line one line two</p>\n<p>next</p>");
    }

    #[test]
    fn headings_and_escaping() {
        let html = to_display_markup("# Title\n### S&P <500>");
        assert_eq!(html, "<h1>Title</h1>\n<h3>S&amp;P &lt;500&gt;</h3>");
    }

    #[test]
    fn blank_line_splits_lists() {
        let blocks = parse_blocks("- a\n\n- b");
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn escaped_script_is_not_reparsed_as_markup() {
        let once = to_display_markup("<script>alert(1)</script>");
        assert_eq!(once, "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>");
        assert_eq!(to_display_markup(&once), once);
    }
}
