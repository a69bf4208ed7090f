#![allow(dead_code)]

//! DOM Processor (spec §4.1, component C1): parses a multi-hundred-kilobyte
//! HTML document, extracts a bounded set of interactive element
//! candidates, generates robust selectors for each, and scores them
//! against the current goal.

pub mod compress;
pub mod config;
pub mod errors;
pub mod extract;
pub mod score;
pub mod selectors;
pub mod skeleton;

use lattice_types::{Element, PageContext};

pub use config::DomConfig;
pub use errors::DomError;

/// `ctx_from_page(page, goal, …) -> PageContext` (spec §4.1).
///
/// Composes `compress` -> `extract` -> `score` -> candidate numbering into a
/// `PageContext`. Parse failure never yields an error here: the regex path
/// is both primary and fallback (spec §9), so a PageContext with an empty
/// `interactive` list is the worst case, never a propagated error.
pub fn ctx_from_page(
    url: &str,
    title: &str,
    raw_html: &str,
    goal: &str,
    cfg: &DomConfig,
) -> PageContext {
    let compressed = compress::compress(raw_html, goal, cfg);
    let sig = compress::signature(&compressed);
    let skel = skeleton::skeleton(&compressed);

    let elements = extract::extract(&compressed);
    let mut scored = score::score(elements, goal);
    scored.truncate(cfg.interactive_max_items);

    for (idx, el) in scored.iter_mut().enumerate() {
        el.candidate_id = (idx + 1) as u32;
        el.text = lattice_types::truncate_chars(&el.text, cfg.interactive_include_text_max);
    }

    PageContext {
        url: url.to_string(),
        title: title.to_string(),
        signature: sig,
        skeleton: skel,
        raw_dom: compressed,
        interactive: scored,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctx_from_page_assigns_unique_sequential_candidate_ids() {
        let cfg = DomConfig::default();
        let html = r#"<a id="a1">One</a><button id="b1">Two</button><a id="a2">Three</a>"#;
        let ctx = ctx_from_page("https://x", "T", html, "find one", &cfg);
        let ids: Vec<u32> = ctx.interactive.iter().map(|e| e.candidate_id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len(), "candidate ids must be unique");
        assert!(ids.iter().all(|&id| id >= 1));
    }

    #[test]
    fn interactive_list_is_sorted_descending_by_score() {
        let cfg = DomConfig::default();
        let html = r#"<a>plain</a><button class="add-to-bag">Add to Bag</button>"#;
        let ctx = ctx_from_page("https://x", "T", html, "add to bag", &cfg);
        for w in ctx.interactive.windows(2) {
            assert!(w[0].score >= w[1].score);
        }
    }

    #[test]
    fn empty_html_produces_empty_interactive_list_and_signature() {
        let cfg = DomConfig::default();
        let ctx = ctx_from_page("https://x", "T", "", "goal", &cfg);
        assert!(ctx.interactive.is_empty());
        assert_eq!(ctx.signature.len(), 16);
    }

    #[test]
    fn signature_is_pure_function_of_raw_dom() {
        let cfg = DomConfig::default();
        let html = "<button>Go</button>";
        let a = ctx_from_page("https://x", "T", html, "go", &cfg);
        let b = ctx_from_page("https://x", "T", html, "go", &cfg);
        assert_eq!(a.signature, b.signature);
        assert_eq!(a.raw_dom, b.raw_dom);
    }
}
