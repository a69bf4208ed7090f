//! Page skeleton pruning (spec §4.1 `skeleton`): retains interactive nodes
//! plus up to three ancestor generations, unwrapping everything else while
//! preserving text, and keeps only a fixed attribute whitelist on the
//! survivors. Never contains `<script>`, `<style>`, `<meta>`, or comments.

use once_cell::sync::Lazy;
use regex::Regex;

const ATTR_WHITELIST: &[&str] = &["id", "class", "role", "name", "placeholder", "href", "type"];

static SCRIPT_STYLE_META: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style|meta)[^>]*?(/>|>.*?</\1>)").unwrap());
static COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TAG_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<([a-zA-Z][a-zA-Z0-9]*)\b((?:[^>"']|"[^"]*"|'[^']*')*)(/?)>"#).unwrap()
});
static ATTR_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*"([^"]*)""#).unwrap());

const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea", "option", "label"];
const ANCESTOR_DEPTH: usize = 3;

/// `skeleton(compressed_html) -> pruned_html` (spec §4.1).
///
/// This is an approximation suitable for an already-compressed, flattened
/// document: it keeps interactive tags with their whitelisted attributes
/// and the `ANCESTOR_DEPTH` tags immediately preceding them in document
/// order (a cheap proxy for "ancestor chain" once the document has been
/// flattened by `compress`), unwrapping every other tag down to its text.
pub fn skeleton(compressed_html: &str) -> String {
    let cleaned = COMMENTS.replace_all(compressed_html, "");
    let cleaned = SCRIPT_STYLE_META.replace_all(&cleaned, "");

    let mut out = String::with_capacity(cleaned.len() / 2);
    let mut last_end = 0;
    let mut recent_open_tags: Vec<String> = Vec::new();

    for caps in TAG_OPEN.captures_iter(&cleaned) {
        let whole = caps.get(0).unwrap();
        out.push_str(&cleaned[last_end..whole.start()]);
        last_end = whole.end();

        let tag = caps[1].to_lowercase();
        let attr_str = &caps[2];
        let self_closing = &caps[3] == "/";

        if INTERACTIVE_TAGS.contains(&tag.as_str()) {
            for ancestor in recent_open_tags.iter().rev().take(ANCESTOR_DEPTH) {
                out.push_str(ancestor);
            }
            out.push_str(&render_whitelisted_tag(&tag, attr_str, self_closing));
        }
        // Non-interactive tags are unwrapped: dropped, their text (handled
        // by the literal passthrough above/below) survives.
        recent_open_tags.push(format!("<{tag}>"));
        if recent_open_tags.len() > ANCESTOR_DEPTH * 4 {
            recent_open_tags.remove(0);
        }
    }
    out.push_str(&cleaned[last_end..]);
    out
}

fn render_whitelisted_tag(tag: &str, attr_str: &str, self_closing: bool) -> String {
    let mut kept = Vec::new();
    for caps in ATTR_PAIR.captures_iter(attr_str) {
        let name = caps[1].to_lowercase();
        if ATTR_WHITELIST.contains(&name.as_str()) || name.starts_with("aria-") || name.starts_with("data-") {
            kept.push(format!("{}=\"{}\"", name, &caps[2]));
        }
    }
    let attrs = if kept.is_empty() { String::new() } else { format!(" {}", kept.join(" ")) };
    if self_closing {
        format!("<{tag}{attrs}/>")
    } else {
        format!("<{tag}{attrs}>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_never_contains_forbidden_tags() {
        let html = "<style>.x{}</style><script>y()</script><meta charset=\"utf8\"><!-- hi --><button>ok</button>";
        let sk = skeleton(html);
        assert!(!sk.contains("<script"));
        assert!(!sk.contains("<style"));
        assert!(!sk.contains("<meta"));
        assert!(!sk.contains("<!--"));
    }

    #[test]
    fn skeleton_keeps_interactive_tag_and_whitelisted_attrs() {
        let html = r#"<div class="wrap"><button id="go" data-qa-item-name="X" onclick="evil()">Go</button></div>"#;
        let sk = skeleton(html);
        assert!(sk.contains("id=\"go\""));
        assert!(!sk.contains("onclick"));
    }
}
