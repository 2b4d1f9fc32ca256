//! Content type sniffing.
//!
//! Sniffing is an optional capability: the extractor holds an
//! `Option<Box<dyn TypeSniffer>>` and leaves `type_description` unset when
//! none is configured.

/// Guess a type description from file content.
pub trait TypeSniffer: Sync {
    /// Returns `None` when the content is not recognised.
    fn sniff(&self, bytes: &[u8]) -> Option<String>;
}

/// Magic-number sniffer backed by the `infer` crate.
///
/// Produces MIME strings. Content `infer` does not know is reported as
/// `text/plain` when it is valid UTF-8, and empty content as
/// `application/x-empty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferSniffer;

impl TypeSniffer for InferSniffer {
    fn sniff(&self, bytes: &[u8]) -> Option<String> {
        if bytes.is_empty() {
            return Some("application/x-empty".to_string());
        }
        if let Some(kind) = infer::get(bytes) {
            return Some(kind.mime_type().to_string());
        }
        std::str::from_utf8(bytes)
            .ok()
            .map(|_| "text/plain".to_string())
    }
}
