//! Markup for each response shape.
//!
//! Renderers are pure: they read a typed document and return a [`Fragment`].
//! All text from the document or the query goes through [`crate::sanitize`].
//! Each result card gets a sequential `data-card-id` and each carousel a
//! `data-carousel-id`, so controllers can address them after rendering.

use serde::Serialize;

use crate::carousel;
use crate::document::{
    EncyclopediaResult, ExamplePair, FallbackText, ParagraphL1ToL2, ParagraphL2ToL1,
    QueryIssueVerdict, ResponseDocument, SentenceL1ToL2, SentenceL2ToL1, WordDictResult,
    WordExplanation,
};
use crate::language::LangCode;
use crate::request::SearchParams;
use crate::sanitize::{escape_html, escape_multiline, inline_markup};

pub const RESULT_PATH: &str = "/result";
pub const TRANSPORT_FAILURE_MESSAGE: &str =
    "We couldn't load results right now. Please try again later.";
const NO_WORD_EXPLANATIONS: &str = "No word explanations available.";
const NO_SENTENCE_CARDS: &str = "No sentence cards available.";

/// Rendered markup plus the addressable parts it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub html: String,
    pub card_count: usize,
    /// Card count of each carousel, indexed by carousel id.
    pub carousels: Vec<usize>,
}

#[derive(Default)]
struct Markup {
    html: String,
    cards: usize,
    carousels: Vec<usize>,
}

impl Markup {
    fn push(&mut self, raw: &str) {
        self.html.push_str(raw);
    }

    fn open_card(&mut self, class: &str) {
        let id = self.cards;
        self.cards += 1;
        self.html.push_str(&format!(
            r#"<article class="result-card {class}" data-card-id="{id}">"#
        ));
    }

    fn close_card(&mut self) {
        self.html.push_str("</article>");
    }

    /// `<tag class="…">escaped text</tag>`
    fn text(&mut self, tag: &str, class: &str, text: &str) {
        self.html.push_str(&format!(
            r#"<{tag} class="{class}">{}</{tag}>"#,
            escape_html(text)
        ));
    }

    /// Like [`Markup::text`], with line breaks preserved.
    fn multiline(&mut self, tag: &str, class: &str, text: &str) {
        self.html.push_str(&format!(
            r#"<{tag} class="{class}">{}</{tag}>"#,
            escape_multiline(text)
        ));
    }

    fn section(&mut self, class: &str, heading: &str, body: impl FnOnce(&mut Self)) {
        self.html
            .push_str(&format!(r#"<section class="{class}"><h3>{heading}</h3>"#));
        body(self);
        self.html.push_str("</section>");
    }

    fn optional_section(&mut self, class: &str, heading: &str, text: Option<&str>) {
        if let Some(text) = non_blank(text) {
            self.section(class, heading, |m| m.multiline("p", "section-body", text));
        }
    }

    fn empty_hint(&mut self, message: &str) {
        self.text("p", "empty-hint", message);
    }

    fn finish(self) -> Fragment {
        Fragment {
            html: self.html,
            card_count: self.cards,
            carousels: self.carousels,
        }
    }
}

/// Renders any classified document. `params` is the search that produced it;
/// when present, query suggestions link to a new search.
pub fn render_document(document: &ResponseDocument, params: Option<&SearchParams>) -> Fragment {
    match document {
        ResponseDocument::QueryIssue(verdict) => render_query_issue(verdict, params),
        ResponseDocument::Encyclopedia(doc) => render_encyclopedia(doc),
        ResponseDocument::SentenceL1ToL2(doc) => render_sentence_l1_to_l2(doc),
        ResponseDocument::SentenceL2ToL1(doc) => render_sentence_l2_to_l1(doc),
        ResponseDocument::ParagraphL1ToL2(doc) => render_paragraph_l1_to_l2(doc),
        ResponseDocument::ParagraphL2ToL1(doc) => render_paragraph_l2_to_l1(doc),
        ResponseDocument::WordDict(doc) => render_word_dict(doc),
        ResponseDocument::Fallback(doc) => render_fallback(doc),
    }
}

pub fn render_word_dict(doc: &WordDictResult) -> Fragment {
    let mut m = Markup::default();
    for entry in &doc.entries {
        m.open_card("word-card");
        m.push(r#"<header class="word-card-header">"#);
        m.text("h2", "word-title", &entry.source_text);
        language_banner(&mut m, entry.source_lang.as_deref(), entry.target_lang.as_deref());
        m.push("</header>");
        if !entry.variants.is_empty() {
            m.push(r#"<ol class="variant-list">"#);
            for variant in &entry.variants {
                m.push(r#"<li class="variant">"#);
                m.text("p", "variant-target", &variant.target_text);
                if let Some(explanation) = non_blank(variant.explanation.as_deref()) {
                    m.multiline("p", "variant-explanation", explanation);
                }
                examples(&mut m, variant.examples.as_deref());
                alternatives(&mut m, "Similar expressions", variant.alternatives.as_deref());
                m.push("</li>");
            }
            m.push("</ol>");
        }
        m.close_card();
    }
    m.finish()
}

pub fn render_encyclopedia(doc: &EncyclopediaResult) -> Fragment {
    let mut m = Markup::default();
    m.open_card("encyclopedia-card");
    if let Some(input) = non_blank(doc.input_text.as_deref()) {
        m.multiline("p", "encyclopedia-input", input);
    }
    m.optional_section(
        "encyclopedia-explanation",
        "Explanation",
        doc.simplified_explanation.as_deref(),
    );
    if !doc.key_terms.is_empty() {
        m.section("encyclopedia-terms", "Key terms", |m| {
            m.push(r#"<dl class="term-list">"#);
            for term in &doc.key_terms {
                m.text("dt", "term", &term.term);
                m.push(r#"<dd class="term-body">"#);
                m.multiline("p", "term-definition", &term.definition);
                if let Some(analogy) = non_blank(term.analogy.as_deref()) {
                    m.multiline("p", "term-analogy", analogy);
                }
                m.push("</dd>");
            }
            m.push("</dl>");
        });
    }
    m.optional_section("encyclopedia-usage", "Usage", doc.usage_context.as_deref());
    m.optional_section("encyclopedia-notes", "Good to know", doc.extra_notes.as_deref());
    m.close_card();
    m.finish()
}

pub fn render_sentence_l1_to_l2(doc: &SentenceL1ToL2) -> Fragment {
    let mut m = Markup::default();
    sentence_l1_to_l2(&mut m, doc, true);
    m.finish()
}

pub fn render_sentence_l2_to_l1(doc: &SentenceL2ToL1) -> Fragment {
    let mut m = Markup::default();
    sentence_l2_to_l1(&mut m, doc, true);
    m.finish()
}

pub fn render_paragraph_l1_to_l2(doc: &ParagraphL1ToL2) -> Fragment {
    let mut m = Markup::default();
    m.open_card("paragraph-card paragraph-l1-l2");
    language_banner(&mut m, doc.l1_lang.as_deref(), doc.l2_lang.as_deref());
    m.multiline("p", "paragraph-source", &doc.l1_paragraph);
    sentence_carousel(&mut m, &doc.sentence_cards, |m, card| {
        sentence_l1_to_l2(m, card, false)
    });
    m.close_card();
    m.finish()
}

pub fn render_paragraph_l2_to_l1(doc: &ParagraphL2ToL1) -> Fragment {
    let mut m = Markup::default();
    m.open_card("paragraph-card paragraph-l2-l1");
    language_banner(&mut m, doc.l2_lang.as_deref(), doc.l1_lang.as_deref());
    m.multiline("p", "paragraph-source", &doc.l2_paragraph);
    m.multiline("p", "paragraph-translation", &doc.paragraph_l1_translation);
    m.optional_section(
        "paragraph-explanation",
        "What it says",
        doc.paragraph_content_explanation_l1.as_deref(),
    );
    sentence_carousel(&mut m, &doc.sentence_cards, |m, card| {
        sentence_l2_to_l1(m, card, false)
    });
    m.close_card();
    m.finish()
}

pub fn render_query_issue(verdict: &QueryIssueVerdict, params: Option<&SearchParams>) -> Fragment {
    let mut m = Markup::default();
    let status = serde_json::to_value(verdict.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_ascii_lowercase))
        .unwrap_or_default();
    m.open_card(&format!("issue-card issue-{}", status.replace('_', "-")));
    m.text("p", "issue-label", verdict.status.label());
    if let Some(reason) = non_blank(verdict.reason.as_deref()) {
        m.multiline("p", "issue-reason", reason);
    }
    if !verdict.suggestions.is_empty() {
        m.section("issue-suggestions", "Did you mean", |m| {
            m.push(r#"<ol class="suggestion-list">"#);
            for suggestion in &verdict.suggestions {
                m.push("<li>");
                match params {
                    Some(params) => {
                        let href = format!(
                            "{RESULT_PATH}?{}",
                            params.with_query(suggestion).to_query_string()
                        );
                        m.push(&format!(
                            r#"<a class="suggestion-link" href="{}">{}</a>"#,
                            escape_html(&href),
                            escape_html(suggestion)
                        ));
                    }
                    None => m.text("span", "suggestion", suggestion),
                }
                m.push("</li>");
            }
            m.push("</ol>");
        });
    }
    m.close_card();
    m.finish()
}

pub fn render_fallback(doc: &FallbackText) -> Fragment {
    let mut m = Markup::default();
    m.open_card("fallback-card");
    m.push(r#"<div class="fallback-body">"#);
    m.push(&inline_markup(&doc.text));
    m.push("</div>");
    m.close_card();
    m.finish()
}

/// Message for an `error` field reported by the endpoint.
pub fn render_error_message(message: &str) -> Fragment {
    let mut m = Markup::default();
    m.push(r#"<div class="result-error" role="alert">"#);
    m.text("p", "error-title", "Something went wrong");
    m.multiline("p", "error-detail", message);
    m.push("</div>");
    m.finish()
}

/// Message for network or parse failures; never includes partial results.
pub fn render_transport_failure() -> Fragment {
    let mut m = Markup::default();
    m.push(r#"<div class="result-error" role="alert">"#);
    m.text("p", "error-detail", TRANSPORT_FAILURE_MESSAGE);
    m.push("</div>");
    m.finish()
}

fn sentence_l1_to_l2(m: &mut Markup, doc: &SentenceL1ToL2, banner: bool) {
    let sentence = &doc.sentence;
    m.open_card("sentence-card sentence-l1-l2");
    if banner {
        language_banner(m, sentence.l1_lang.as_deref(), sentence.l2_lang.as_deref());
    }
    m.push(r#"<section class="sentence-main">"#);
    m.text("p", "sentence-source", &sentence.l1_sentence);
    m.text("p", "sentence-translation", &sentence.main_l2_sentence);
    m.push("</section>");
    if let Some(alts) = sentence
        .alternative_l2_sentences
        .as_deref()
        .filter(|alts| !alts.is_empty())
    {
        m.section("sentence-alternatives", "Other ways to say it", |m| {
            m.push(r#"<ul class="alternative-list">"#);
            for alt in alts {
                m.text("li", "alternative", alt);
            }
            m.push("</ul>");
        });
    }
    word_explanations(m, doc.l2_focus_sentence.as_deref(), doc.word_explanations.as_deref());
    m.close_card();
}

fn sentence_l2_to_l1(m: &mut Markup, doc: &SentenceL2ToL1, banner: bool) {
    let sentence = &doc.sentence;
    m.open_card("sentence-card sentence-l2-l1");
    if banner {
        language_banner(m, sentence.l2_lang.as_deref(), sentence.l1_lang.as_deref());
    }
    m.push(r#"<section class="sentence-main">"#);
    m.text("p", "sentence-source", &sentence.l2_sentence);
    m.text("p", "sentence-translation", &sentence.main_l1_sentence);
    m.push("</section>");
    m.optional_section(
        "sentence-explanation",
        "Meaning",
        sentence.sentence_explanation_l1.as_deref(),
    );
    word_explanations(m, doc.l2_focus_sentence.as_deref(), doc.word_explanations.as_deref());
    m.close_card();
}

fn word_explanations(m: &mut Markup, focus: Option<&str>, items: Option<&[WordExplanation]>) {
    m.push(r#"<section class="word-explanations"><h3>Word notes</h3>"#);
    if let Some(focus) = non_blank(focus) {
        m.text("p", "focus-sentence", focus);
    }
    match items.filter(|items| !items.is_empty()) {
        Some(items) => {
            m.push(r#"<ul class="word-explanation-list">"#);
            for item in items {
                m.push(r#"<li class="word-explanation">"#);
                m.text("span", "word", &item.l2_word);
                m.text("span", "meaning", &item.meaning_l1);
                if let Some(explanation) = non_blank(item.explanation_l1.as_deref()) {
                    m.multiline("p", "word-detail", explanation);
                }
                examples(m, item.examples.as_deref());
                alternatives(m, "Similar expressions", item.alternatives_l2.as_deref());
                m.push("</li>");
            }
            m.push("</ul>");
        }
        None => m.empty_hint(NO_WORD_EXPLANATIONS),
    }
    m.push("</section>");
}

fn sentence_carousel<T>(m: &mut Markup, cards: &[T], mut card: impl FnMut(&mut Markup, &T)) {
    if cards.is_empty() {
        m.empty_hint(NO_SENTENCE_CARDS);
        return;
    }
    let id = m.carousels.len();
    let count = cards.len();
    m.carousels.push(count);
    let initial = carousel::view(0, count);
    m.push(&format!(
        r#"<div class="sentence-carousel" data-carousel-id="{id}" data-card-count="{count}"><div class="carousel-track">"#
    ));
    for (index, item) in cards.iter().enumerate() {
        let visible = initial.cards[index];
        m.push(&format!(
            r#"<div class="carousel-page{}" data-page-index="{index}"{}>"#,
            if visible { " is-visible" } else { "" },
            if visible { "" } else { " hidden" },
        ));
        card(m, item);
        m.push("</div>");
    }
    m.push("</div>");
    if !initial.indicators.is_empty() {
        m.push(r#"<div class="carousel-indicators">"#);
        for (index, active) in initial.indicators.iter().enumerate() {
            m.push(&format!(
                r#"<button type="button" class="carousel-dot{}" data-index="{index}" aria-label="Sentence {}"></button>"#,
                if *active { " is-active" } else { "" },
                index + 1
            ));
        }
        m.push("</div>");
    }
    m.push("</div>");
}

fn language_banner(m: &mut Markup, from: Option<&str>, to: Option<&str>) {
    let (Some(from), Some(to)) = (non_blank(from), non_blank(to)) else {
        return;
    };
    m.push(r#"<div class="lang-banner">"#);
    m.text("span", "lang-from", &language_label(from));
    m.push(r#"<span class="lang-arrow">→</span>"#);
    m.text("span", "lang-to", &language_label(to));
    m.push("</div>");
}

fn language_label(code: &str) -> String {
    LangCode::parse(code)
        .map(|code| code.display_name().to_string())
        .unwrap_or_else(|| code.to_string())
}

fn examples(m: &mut Markup, pairs: Option<&[ExamplePair]>) {
    let Some(pairs) = pairs.filter(|pairs| !pairs.is_empty()) else {
        return;
    };
    m.push(r#"<ul class="example-list">"#);
    for pair in pairs {
        m.push(r#"<li class="example">"#);
        m.text("span", "example-source", &pair.source_sentence);
        m.text("span", "example-target", &pair.target_sentence);
        m.push("</li>");
    }
    m.push("</ul>");
}

fn alternatives(m: &mut Markup, label: &str, items: Option<&[String]>) {
    let Some(items) = items.filter(|items| !items.is_empty()) else {
        return;
    };
    let joined = items
        .iter()
        .map(|item| escape_html(item))
        .collect::<Vec<_>>()
        .join(", ");
    m.push(&format!(
        r#"<p class="alternatives"><span class="label">{label}</span> {joined}</p>"#
    ));
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
