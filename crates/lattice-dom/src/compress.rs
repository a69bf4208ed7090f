use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::config::{budget_for_goal, wants_footer_preserving_truncation, DomConfig};

static EMPTY_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"<!---->").unwrap());
static SCRIPT_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</\1>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static FOOTER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?is)<div[^>]*class="[^"]*footer[^"]*"[^>]*>.*?</div>"#,
        r"(?is)<footer[^>]*>.*?</footer>",
        r#"(?is)<div[^>]*class="[^"]*actions[^"]*"[^>]*>.*?</div>"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// `compress(raw_html, goal) -> compressed_html` (spec §4.1).
///
/// Strips `<script>`/`<style>` contents, collapses whitespace, removes
/// empty Vue comment artifacts, then truncates to a goal-dependent size
/// budget. Cart/checkout goals get a footer-preserving truncation: a
/// detected footer/action region is spliced onto the retained head so the
/// critical affordance survives the cap.
pub fn compress(raw_html: &str, goal: &str, cfg: &DomConfig) -> String {
    let max_chars = budget_for_goal(cfg, goal);

    let cleaned = EMPTY_COMMENT.replace_all(raw_html, "");
    let cleaned = SCRIPT_STYLE.replace_all(&cleaned, "");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let mut cleaned = cleaned.trim().to_string();

    if wants_footer_preserving_truncation(goal) {
        let mut footer_content = String::new();
        for pattern in FOOTER_PATTERNS.iter() {
            if let Some(m) = pattern.find(&cleaned) {
                footer_content.push_str(m.as_str());
                break;
            }
        }
        if !footer_content.is_empty() && cleaned.chars().count() > max_chars {
            let head_budget = max_chars.saturating_sub(footer_content.chars().count() + 1);
            let head: String = cleaned.chars().take(head_budget).collect();
            cleaned = format!("{head} {footer_content}");
        }
    }

    truncate_chars(&cleaned, max_chars)
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

/// `signature(compressed_html) -> hex16` (spec §4.1, P1).
///
/// First 16 hex digits of the SHA-256 of the input. Pure function: equal
/// inputs always yield equal signatures.
pub fn signature(compressed_html: &str) -> String {
    let digest = Sha256::digest(compressed_html.as_bytes());
    let hex = format!("{digest:x}");
    hex[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic() {
        let html = "<div>hello</div>";
        assert_eq!(signature(html), signature(html));
    }

    #[test]
    fn compress_is_idempotent_on_cleaned_input() {
        let cfg = DomConfig::default();
        let html = "<script>evil()</script><div   class=\"a\">hi   there</div>";
        let once = compress(html, "", &cfg);
        let twice = compress(&once, "", &cfg);
        assert_eq!(once, twice);
    }

    #[test]
    fn compress_strips_scripts_and_styles() {
        let cfg = DomConfig::default();
        let html = "<style>.x{color:red}</style><script>var x=1;</script><p>keep</p>";
        let out = compress(html, "", &cfg);
        assert!(!out.contains("color:red"));
        assert!(!out.contains("var x"));
        assert!(out.contains("keep"));
    }

    #[test]
    fn compress_picks_location_budget() {
        let cfg = DomConfig::default();
        let big = "<div>x</div>".repeat(20_000);
        let base = compress(&big, "find stores", &cfg);
        let location = compress(&big, "select the nearest store location", &cfg);
        assert!(location.chars().count() >= base.chars().count());
    }

    #[test]
    fn empty_html_yields_empty_compressed_output_with_signature() {
        let cfg = DomConfig::default();
        let out = compress("", "", &cfg);
        assert_eq!(out, "");
        assert_eq!(signature(&out).len(), 16);
    }
}
