//! Resource reference normalization.
//!
//! Stored resource pointers are either absolute URLs or storage-relative
//! paths. Documents only ever carry absolute URLs.

use url::Url;

/// Turns relative storage paths into absolute URLs under a configured base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceNormalizer {
    base: String,
}

impl ReferenceNormalizer {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Normalize an optional pointer. Empty or missing input yields `None`.
    ///
    /// Already-absolute URLs are returned unchanged, so normalizing twice is
    /// the same as normalizing once.
    pub fn normalize(&self, reference: Option<&str>) -> Option<String> {
        let reference = reference?.trim();
        if reference.is_empty() {
            return None;
        }
        if is_absolute(reference) {
            return Some(reference.to_string());
        }
        Some(format!(
            "{}/{}",
            self.base,
            reference.trim_start_matches('/')
        ))
    }
}

/// Opaque schemes accepted without a host.
const OPAQUE_SCHEMES: [&str; 2] = ["data", "blob"];

/// Whether `reference` is a URL with a host, or a `data:`/`blob:` URL.
///
/// A storage path like `part1:intro.mp3` also parses as a URL, with scheme
/// `part1`, but is still relative.
pub fn is_absolute(reference: &str) -> bool {
    Url::parse(reference)
        .is_ok_and(|url| url.has_host() || OPAQUE_SCHEMES.contains(&url.scheme()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> ReferenceNormalizer {
        ReferenceNormalizer::new("https://cdn.example.com/assets/")
    }

    #[test]
    fn prefixes_relative_paths_with_single_slash() {
        let n = normalizer();
        assert_eq!(
            n.normalize(Some("audio/clip.mp3")).as_deref(),
            Some("https://cdn.example.com/assets/audio/clip.mp3")
        );
        assert_eq!(
            n.normalize(Some("/audio/clip.mp3")).as_deref(),
            Some("https://cdn.example.com/assets/audio/clip.mp3")
        );
    }

    #[test]
    fn absolute_urls_are_untouched() {
        let n = normalizer();
        let url = "https://other.example.org/x.mp3";
        assert_eq!(n.normalize(Some(url)).as_deref(), Some(url));
        assert_eq!(
            n.normalize(Some("data:audio/mp3;base64,AAAA")).as_deref(),
            Some("data:audio/mp3;base64,AAAA")
        );
    }

    #[test]
    fn colon_in_storage_path_is_still_relative() {
        let n = normalizer();
        assert!(!is_absolute("part1:intro.mp3"));
        assert_eq!(
            n.normalize(Some("part1:intro.mp3")).as_deref(),
            Some("https://cdn.example.com/assets/part1:intro.mp3")
        );
        assert!(is_absolute("blob:https://app.example.com/5f0c"));
        assert!(!is_absolute("mailto:someone@example.com"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let n = normalizer();
        let once = n.normalize(Some("x.mp3"));
        let twice = n.normalize(once.as_deref());
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_input_yields_none() {
        let n = normalizer();
        assert_eq!(n.normalize(None), None);
        assert_eq!(n.normalize(Some("")), None);
        assert_eq!(n.normalize(Some("   ")), None);
    }
}
