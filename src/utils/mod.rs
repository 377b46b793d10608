// src/utils/mod.rs

//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_paths() {
        let base = Url::parse("https://site.example/games/page").unwrap();
        assert_eq!(
            resolve_url(&base, "/events/a"),
            "https://site.example/events/a"
        );
    }

    #[test]
    fn absolute_hrefs_pass_through() {
        let base = Url::parse("https://site.example/page").unwrap();
        assert_eq!(
            resolve_url(&base, "https://other.example/x"),
            "https://other.example/x"
        );
    }

    #[test]
    fn query_only_hrefs_resolve_against_the_page() {
        let base = Url::parse("https://site.example/games/page").unwrap();
        assert_eq!(
            resolve_url(&base, "?tab=events"),
            "https://site.example/games/page?tab=events"
        );
    }
}
