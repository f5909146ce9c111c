//! Presentation engine for the adaptive dictionary.
//!
//! Response documents from the query endpoint are classified into one of eight
//! shapes ([`document`]), rendered to escaped markup ([`render`]), and then
//! driven by a per-page [`controller::ResultController`] that owns carousel and
//! card-selection state. The learner's language pair lives in [`language`] and
//! survives reloads through a [`store::KeyValueStore`].

pub mod carousel;
#[cfg(feature = "web")]
pub mod client;
pub mod controller;
pub mod document;
pub mod language;
pub mod render;
pub mod request;
pub mod sanitize;
pub mod store;
#[cfg(feature = "web")]
pub mod web;

pub use carousel::{Carousel, CarouselInput, CarouselView, PointerZone};
pub use controller::{
    CardSelection, ControllerError, RenderedResult, ResultController, ResultKind, TransportError,
};
pub use document::{QueryIssueVerdict, QueryStatus, ResponseDocument, ShapeTag, classify};
pub use language::{LangCode, LanguagePair, LanguageState};
pub use render::Fragment;
pub use request::{SearchMode, SearchParams, SearchRequest};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};

/// Classifies `value` and renders it without a surrounding search context.
pub fn present(value: &serde_json::Value, mode: SearchMode) -> (ShapeTag, Fragment) {
    let document = ResponseDocument::from_value(value, mode);
    (document.shape(), render::render_document(&document, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn present_returns_shape_and_markup() {
        let (shape, fragment) = present(&document::fixtures::word_dict(), SearchMode::Dictionary);
        assert_eq!(shape, ShapeTag::WordDict);
        assert!(fragment.html.contains("사과"));

        let (shape, fragment) = present(&json!({"key_terms": []}), SearchMode::Encyclopedia);
        assert_eq!(shape, ShapeTag::Encyclopedia);
        assert_eq!(fragment.card_count, 1);
    }
}
