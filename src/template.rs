//! Page template rendering
//!
//! Templates are plain HTML with `{{ name }}` placeholders. Values are HTML
//! escaped; placeholders without a value render as an empty string.

/// Render `source`, substituting `vars` into its placeholders
pub fn render(source: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            // Unterminated placeholder, emit verbatim
            out.push_str(&rest[open..]);
            return out;
        };

        let name = after_open[..close].trim();
        if is_identifier(name) {
            if let Some((_, value)) = vars.iter().find(|(key, _)| *key == name) {
                out.push_str(&escape_html(value));
            }
        } else {
            out.push_str(&rest[open..open + 2 + close + 2]);
        }
        rest = &after_open[close + 2..];
    }

    out.push_str(rest);
    out
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escape text for an HTML body or attribute
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
