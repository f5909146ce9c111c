//! Escaping for untrusted text before it is interpolated into markup.
//!
//! Every renderer routes model output and user input through [`escape_html`]
//! or [`escape_multiline`]. The only place the crate inserts structural markup
//! derived from text content is [`inline_markup`], which runs on text that has
//! already been escaped.

/// Escapes the five characters that are significant in HTML text and
/// attribute positions.
///
/// Escaping is not idempotent: running it twice double-escapes `&`.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 8);
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Escapes `input`, then turns line breaks into `<br>`.
///
/// The break substitution happens after escaping so a literal `<br>` in the
/// input still comes out as text.
pub fn escape_multiline(input: &str) -> String {
    normalize_newlines(&escape_html(input)).replace('\n', "<br>")
}

/// Minimal inline formatting used by the fallback renderer.
///
/// `**bold**` becomes `<strong>`, a blank line starts a new paragraph and a
/// single newline becomes `<br>`. The text is escaped first. Bold delimiters
/// that appear in the source text are treated as formatting too.
pub fn inline_markup(input: &str) -> String {
    let escaped = normalize_newlines(&escape_html(input.trim()));
    let emphasized = replace_bold(&escaped);
    let paragraphs = emphasized
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| format!("<p>{}</p>", block.replace('\n', "<br>")))
        .collect::<Vec<_>>();
    paragraphs.join("")
}

fn normalize_newlines(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn replace_bold(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("**") {
        let after_open = &rest[start + 2..];
        let Some(len) = after_open.find("**") else {
            break;
        };
        if len == 0 {
            out.push_str(&rest[..start + 4]);
            rest = &rest[start + 4..];
            continue;
        }
        out.push_str(&rest[..start]);
        out.push_str("<strong>");
        out.push_str(&after_open[..len]);
        out.push_str("</strong>");
        rest = &after_open[len + 2..];
    }
    out.push_str(rest);
    out
}
