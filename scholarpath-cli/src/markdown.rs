//! Terminal markdown renderer for explanation bodies.
//!
//! Explanations arrive as loose markdown. This renders the subset the backend
//! actually produces (headings, bullets, numbered items, fenced code, bold,
//! italic and inline code) to ANSI escape codes, joins soft-wrapped lines into
//! paragraphs and re-wraps them to the terminal width with `textwrap`.

/// ANSI escape codes for terminal formatting.
pub(crate) mod ansi {
    pub const BOLD_ON: &str = "\x1b[1m";
    pub const BOLD_OFF: &str = "\x1b[22m";
    pub const ITALIC_ON: &str = "\x1b[3m";
    pub const ITALIC_OFF: &str = "\x1b[23m";
    pub const UNDERLINE_ON: &str = "\x1b[4m";
    pub const DIM_ON: &str = "\x1b[2m";
    pub const DIM_OFF: &str = "\x1b[22m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    /// Restores the foreground color without touching bold/italic.
    pub const FG_DEFAULT: &str = "\x1b[39m";
    pub const RESET: &str = "\x1b[0m";
}

/// Output width, color and left margin for rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownStyle {
    pub width: usize,
    pub color: bool,
    pub indent: usize,
}

impl MarkdownStyle {
    pub fn new(width: usize, color: bool) -> Self {
        Self {
            width,
            color,
            indent: 0,
        }
    }

    /// The same style with a left margin of `indent` columns.
    pub fn indented(self, indent: usize) -> Self {
        Self { indent, ..self }
    }

    /// Wrap `text` in the given escape codes when color is enabled.
    pub fn paint(&self, text: &str, on: &str, off: &str) -> String {
        if self.color {
            format!("{on}{text}{off}")
        } else {
            text.to_string()
        }
    }

    fn margin(&self) -> String {
        " ".repeat(self.indent)
    }
}

/// Render a markdown document to wrapped terminal text.
///
/// Trailing blank lines are dropped; consecutive blank lines collapse to one.
pub fn render_markdown(text: &str, style: &MarkdownStyle) -> String {
    let margin = style.margin();
    let mut out: Vec<String> = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut in_code_block = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            flush_paragraph(&mut paragraph, &mut out, style);
            in_code_block = !in_code_block;
            continue;
        }

        // Code is kept verbatim: no wrapping, no inline formatting.
        if in_code_block {
            let code = style.paint(line.trim_end(), ansi::DIM_ON, ansi::DIM_OFF);
            out.push(format!("{margin}    {code}"));
            continue;
        }

        if trimmed.is_empty() {
            flush_paragraph(&mut paragraph, &mut out, style);
            if out.last().is_some_and(|last| !last.is_empty()) {
                out.push(String::new());
            }
            continue;
        }

        if let Some(heading) = parse_heading(trimmed) {
            flush_paragraph(&mut paragraph, &mut out, style);
            let on = format!("{}{}", ansi::BOLD_ON, ansi::UNDERLINE_ON);
            let heading = style.paint(&render_inline(heading, style), &on, ansi::RESET);
            out.push(format!("{margin}{heading}"));
            continue;
        }

        if let Some((marker, item)) = parse_list_item(trimmed) {
            flush_paragraph(&mut paragraph, &mut out, style);
            let first = format!("{margin}  {marker} ");
            let rest = " ".repeat(first.chars().count());
            out.push(wrap(&render_inline(item, style), style.width, &first, &rest));
            continue;
        }

        paragraph.push(trimmed);
    }
    flush_paragraph(&mut paragraph, &mut out, style);

    while out.last().is_some_and(|last| last.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// Wrap already-rendered text with the given first-line and continuation prefixes.
pub fn wrap(text: &str, width: usize, first: &str, rest: &str) -> String {
    let options = textwrap::Options::new(width)
        .initial_indent(first)
        .subsequent_indent(rest);
    textwrap::fill(text, options)
}

fn flush_paragraph(paragraph: &mut Vec<&str>, out: &mut Vec<String>, style: &MarkdownStyle) {
    if paragraph.is_empty() {
        return;
    }
    let joined = paragraph.join(" ");
    paragraph.clear();
    let margin = style.margin();
    out.push(wrap(&render_inline(&joined, style), style.width, &margin, &margin));
}

/// Parse an ATX heading (`#` through `####`), returning the heading text.
fn parse_heading(line: &str) -> Option<&str> {
    let hashes = line.len() - line.trim_start_matches('#').len();
    if !(1..=4).contains(&hashes) {
        return None;
    }
    line[hashes..].strip_prefix(' ').map(str::trim)
}

/// Parse `- item`, `* item` or `12. item`, returning the display marker and the item text.
fn parse_list_item(line: &str) -> Option<(String, &str)> {
    if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some(("\u{2022}".to_string(), item));
    }
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0
        && let Some(item) = line[digits..].strip_prefix(". ")
    {
        return Some((line[..=digits].to_string(), item));
    }
    None
}

/// Apply inline formatting: `**bold**`, `*italic*` and `` `code` ``.
///
/// Unmatched delimiters are left as literal text. Without color the
/// delimiters of matched spans are dropped.
fn render_inline(text: &str, style: &MarkdownStyle) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("**")
            && let Some(end) = after.find("**")
            && end > 0
        {
            let inner = render_inline(&after[..end], style);
            out.push_str(&style.paint(&inner, ansi::BOLD_ON, ansi::BOLD_OFF));
            rest = &after[end + 2..];
            continue;
        }

        if let Some(after) = rest.strip_prefix('`')
            && let Some(end) = after.find('`')
        {
            out.push_str(&style.paint(&after[..end], ansi::CYAN, ansi::FG_DEFAULT));
            rest = &after[end + 1..];
            continue;
        }

        if let Some(after) = rest.strip_prefix('*')
            && !after.starts_with([' ', '*'])
            && let Some(end) = after.find('*')
            && end > 0
            && !after[..end].ends_with(' ')
        {
            out.push_str(&style.paint(&after[..end], ansi::ITALIC_ON, ansi::ITALIC_OFF));
            rest = &after[end + 1..];
            continue;
        }

        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out
}
