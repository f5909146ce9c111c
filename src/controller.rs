//! Result page lifecycle: one request, one render, then interaction.
//!
//! A [`ResultController`] is built from the navigation parameters and the
//! persisted language pair. It hands out exactly one [`SearchRequest`], takes
//! the outcome of that request, renders it, and afterwards owns the carousel
//! and card selection state for the rendered markup.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::carousel::{Carousel, CarouselInput, CarouselView};
use crate::document::{ResponseDocument, ShapeTag};
use crate::language::{LangCode, LanguagePair, LanguageState};
use crate::render::{self, Fragment};
use crate::request::{DEFAULT_FIELD, SearchMode, SearchParams, SearchRequest};
use crate::store::KeyValueStore;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("query endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("query endpoint timed out")]
    Timeout,
    #[error("query endpoint returned an unreadable body: {0}")]
    Body(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("query is empty")]
    EmptyQuery,
    #[error("a request was already issued for this page")]
    AlreadyRequested,
    #[error("no request is pending")]
    NotRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "shape", rename_all = "snake_case")]
pub enum ResultKind {
    Document(ShapeTag),
    ApplicationError,
    TransportFailure,
}

/// Markup for the results area plus what the page needs to wire it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedResult {
    pub kind: ResultKind,
    pub html: String,
    pub card_count: usize,
    pub carousels: Vec<usize>,
}

impl RenderedResult {
    fn new(kind: ResultKind, fragment: Fragment) -> Self {
        Self {
            kind,
            html: fragment.html,
            card_count: fragment.card_count,
            carousels: fragment.carousels,
        }
    }

    pub fn shape(&self) -> Option<ShapeTag> {
        match self.kind {
            ResultKind::Document(shape) => Some(shape),
            _ => None,
        }
    }
}

/// Exclusive selection over the rendered result cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardSelection {
    count: usize,
    selected: Option<usize>,
}

impl CardSelection {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            selected: None,
        }
    }

    /// Resumes a selection; an id outside the card range is dropped.
    pub fn restore(count: usize, selected: Option<usize>) -> Self {
        Self {
            count,
            selected: selected.filter(|id| *id < count),
        }
    }

    /// `card` is the id of the nearest enclosing card, or `None` for clicks
    /// outside every card, which change nothing.
    pub fn select(&mut self, card: Option<usize>) -> Option<usize> {
        if let Some(id) = card.filter(|id| *id < self.count) {
            self.selected = Some(id);
        }
        self.selected
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Pending,
    Done,
}

pub struct ResultController<S> {
    language: LanguageState<S>,
    params: SearchParams,
    mode: SearchMode,
    phase: Phase,
    result: Option<RenderedResult>,
    carousels: Vec<Carousel>,
    selection: CardSelection,
}

fn transport_failure() -> RenderedResult {
    RenderedResult::new(ResultKind::TransportFailure, render::render_transport_failure())
}

impl<S: KeyValueStore> ResultController<S> {
    pub fn new(store: S, locale_hint: Option<&str>, params: SearchParams) -> Self {
        let mode = params.search_mode();
        Self {
            language: LanguageState::restore(store, locale_hint),
            params,
            mode,
            phase: Phase::Idle,
            result: None,
            carousels: Vec::new(),
            selection: CardSelection::default(),
        }
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn language(&self) -> &LanguageState<S> {
        &self.language
    }

    pub fn into_store(self) -> S {
        self.language.into_store()
    }

    /// Returns whether the target selector is enabled afterwards.
    pub fn set_mode(&mut self, mode: SearchMode) -> bool {
        if self.mode != mode {
            debug!(
                from = self.mode.query_value(),
                to = mode.query_value(),
                "Search mode changed"
            );
            self.mode = mode;
            self.params.mode = mode.query_value().to_string();
        }
        self.language.target_enabled(self.mode)
    }

    pub fn toggle_mode(&mut self) -> bool {
        self.set_mode(self.mode.toggled())
    }

    pub fn set_native(&mut self, code: LangCode) -> LanguagePair {
        self.language.set_native(code)
    }

    pub fn set_target(&mut self, code: LangCode) -> LanguagePair {
        self.language.set_target(code)
    }

    pub fn swap_languages(&mut self) -> LanguagePair {
        self.language.swap()
    }

    /// Builds the single request for this page.
    ///
    /// Language codes in the parameters win when they are supported;
    /// otherwise the persisted pair fills in.
    pub fn begin_request(&mut self) -> Result<SearchRequest, ControllerError> {
        if self.phase != Phase::Idle {
            return Err(ControllerError::AlreadyRequested);
        }
        let query = self.params.query.trim();
        if query.is_empty() {
            return Err(ControllerError::EmptyQuery);
        }
        let native = LangCode::parse(&self.params.native_lang).unwrap_or(self.language.native());
        let target = self
            .language
            .submitted_target(self.mode)
            .map(|stored| LangCode::parse(&self.params.target_lang).unwrap_or(stored))
            .map(|target| if target == native { native.complement() } else { target });
        let field = match self.params.field.trim() {
            "" => DEFAULT_FIELD.to_string(),
            field => field.to_string(),
        };
        let request = SearchRequest {
            education: self.params.education.trim().to_string(),
            field,
            query: query.to_string(),
            mode: self.mode,
            native_lang: native,
            target_lang: target,
        };
        self.phase = Phase::Pending;
        info!(
            mode = request.mode.query_value(),
            native_lang = %request.native_lang,
            target_lang = request.target_lang.map(LangCode::code).unwrap_or(""),
            "Issuing search request"
        );
        Ok(request)
    }

    /// Consumes the response body (or transport failure) of the pending
    /// request and renders it.
    pub fn complete(
        &mut self,
        outcome: Result<String, TransportError>,
    ) -> Result<&RenderedResult, ControllerError> {
        if self.phase != Phase::Pending {
            return Err(ControllerError::NotRequested);
        }
        self.phase = Phase::Done;
        let rendered = match outcome {
            Ok(body) => match serde_json::from_str::<Value>(&body) {
                Ok(value) => self.render_value(&value),
                Err(err) => {
                    warn!(error = %err, "query endpoint returned invalid JSON");
                    transport_failure()
                }
            },
            Err(err) => {
                warn!(error = %err, "search request failed");
                transport_failure()
            }
        };
        Ok(self.install(rendered))
    }

    fn render_value(&self, value: &Value) -> RenderedResult {
        if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
            let message = match error {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            };
            return RenderedResult::new(
                ResultKind::ApplicationError,
                render::render_error_message(&message),
            );
        }
        let document = ResponseDocument::from_value(value, self.mode);
        let fragment = render::render_document(&document, Some(&self.params));
        RenderedResult::new(ResultKind::Document(document.shape()), fragment)
    }

    fn install(&mut self, rendered: RenderedResult) -> &RenderedResult {
        self.carousels = rendered
            .carousels
            .iter()
            .filter_map(|len| Carousel::new(*len))
            .collect();
        self.selection = CardSelection::new(rendered.card_count);
        debug!(
            kind = ?rendered.kind,
            cards = rendered.card_count,
            carousels = self.carousels.len(),
            "Rendered result"
        );
        self.result.insert(rendered)
    }

    pub fn result(&self) -> Option<&RenderedResult> {
        self.result.as_ref()
    }

    pub fn carousel(&self, container: usize) -> Option<&Carousel> {
        self.carousels.get(container)
    }

    pub fn carousel_pointer(
        &mut self,
        container: usize,
        x: f64,
        width: f64,
    ) -> Option<CarouselView> {
        self.carousels.get_mut(container)?.pointer(x, width)
    }

    pub fn carousel_indicator(&mut self, container: usize, raw: &str) -> Option<CarouselView> {
        self.carousels.get_mut(container)?.jump_to_indicator(raw)
    }

    pub fn carousel_input(
        &mut self,
        container: usize,
        input: &CarouselInput,
    ) -> Option<CarouselView> {
        self.carousels.get_mut(container)?.apply(input)
    }

    /// Click on the results area; see [`CardSelection::select`].
    pub fn select_card(&mut self, card: Option<usize>) -> Option<usize> {
        self.selection.select(card)
    }

    pub fn selected_card(&self) -> Option<usize> {
        self.selection.selected()
    }
}
