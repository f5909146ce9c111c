//! Response documents and their classification.
//!
//! The query endpoint returns one of several JSON shapes without a
//! discriminant. [`classify`] decides the shape with an ordered chain of
//! structural predicates; [`ResponseDocument::from_value`] then reads the
//! document into the matching typed variant.
//!
//! The order of the chain is part of the contract. Several shapes are loose
//! enough that a document built for a later shape can satisfy an earlier test
//! only if the order is changed, so each step must stay where it is:
//!
//! 1. query issue (status present and not `VALID`)
//! 2. encyclopedia (request mode alone decides)
//! 3. sentence L1→L2
//! 4. sentence L2→L1
//! 5. paragraph L1→L2
//! 6. paragraph L2→L1
//! 7. word dictionary
//! 8. fallback

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::request::SearchMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeTag {
    QueryIssue,
    Encyclopedia,
    SentenceL1ToL2,
    SentenceL2ToL1,
    ParagraphL1ToL2,
    ParagraphL2ToL1,
    WordDict,
    Fallback,
}

impl ShapeTag {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeTag::QueryIssue => "query_issue",
            ShapeTag::Encyclopedia => "encyclopedia",
            ShapeTag::SentenceL1ToL2 => "sentence_l1_to_l2",
            ShapeTag::SentenceL2ToL1 => "sentence_l2_to_l1",
            ShapeTag::ParagraphL1ToL2 => "paragraph_l1_to_l2",
            ShapeTag::ParagraphL2ToL1 => "paragraph_l2_to_l1",
            ShapeTag::WordDict => "word_dict",
            ShapeTag::Fallback => "fallback",
        }
    }

    pub fn is_paragraph(&self) -> bool {
        matches!(self, ShapeTag::ParagraphL1ToL2 | ShapeTag::ParagraphL2ToL1)
    }
}

impl fmt::Display for ShapeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    Valid,
    Typo,
    FactualError,
    Ambiguous,
    Nonsense,
}

impl QueryStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "VALID" => Some(QueryStatus::Valid),
            "TYPO" => Some(QueryStatus::Typo),
            "FACTUAL_ERROR" => Some(QueryStatus::FactualError),
            "AMBIGUOUS" => Some(QueryStatus::Ambiguous),
            "NONSENSE" => Some(QueryStatus::Nonsense),
            _ => None,
        }
    }

    pub fn is_issue(&self) -> bool {
        *self != QueryStatus::Valid
    }

    pub fn label(&self) -> &'static str {
        match self {
            QueryStatus::Valid => "Valid query",
            QueryStatus::Typo => "Possible typo / misspelling",
            QueryStatus::FactualError => "Possible factual error",
            QueryStatus::Ambiguous => "Ambiguous query",
            QueryStatus::Nonsense => "Query doesn't make sense",
        }
    }
}

/// Terminal verdict on the query itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryIssueVerdict {
    pub status: QueryStatus,
    pub reason: Option<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamplePair {
    #[serde(deserialize_with = "null_as_default")]
    pub source_sentence: String,
    #[serde(deserialize_with = "null_as_default")]
    pub target_sentence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyTerm {
    #[serde(deserialize_with = "null_as_default")]
    pub term: String,
    #[serde(deserialize_with = "null_as_default")]
    pub definition: String,
    pub analogy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncyclopediaResult {
    pub input_text: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub key_terms: Vec<KeyTerm>,
    pub simplified_explanation: Option<String>,
    pub usage_context: Option<String>,
    pub extra_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordExplanation {
    #[serde(deserialize_with = "null_as_default")]
    pub l2_word: String,
    #[serde(deserialize_with = "null_as_default")]
    pub meaning_l1: String,
    pub explanation_l1: Option<String>,
    pub examples: Option<Vec<ExamplePair>>,
    pub alternatives_l2: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceL1ToL2Block {
    #[serde(deserialize_with = "null_as_default")]
    pub l1_sentence: String,
    pub l1_lang: Option<String>,
    pub l2_lang: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub main_l2_sentence: String,
    pub alternative_l2_sentences: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceL1ToL2 {
    pub sentence: SentenceL1ToL2Block,
    pub l2_focus_sentence: Option<String>,
    pub word_explanations: Option<Vec<WordExplanation>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceL2ToL1Block {
    #[serde(deserialize_with = "null_as_default")]
    pub l2_sentence: String,
    pub l2_lang: Option<String>,
    pub l1_lang: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub main_l1_sentence: String,
    pub sentence_explanation_l1: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceL2ToL1 {
    pub sentence: SentenceL2ToL1Block,
    pub l2_focus_sentence: Option<String>,
    pub word_explanations: Option<Vec<WordExplanation>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphL1ToL2 {
    #[serde(deserialize_with = "null_as_default")]
    pub l1_paragraph: String,
    pub l1_lang: Option<String>,
    pub l2_lang: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub sentence_cards: Vec<SentenceL1ToL2>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphL2ToL1 {
    #[serde(deserialize_with = "null_as_default")]
    pub l2_paragraph: String,
    pub l2_lang: Option<String>,
    pub l1_lang: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub paragraph_l1_translation: String,
    pub paragraph_content_explanation_l1: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub sentence_cards: Vec<SentenceL2ToL1>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordSenseVariant {
    #[serde(deserialize_with = "null_as_default")]
    pub target_text: String,
    pub explanation: Option<String>,
    pub examples: Option<Vec<ExamplePair>>,
    pub alternatives: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordDictEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub source_text: String,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub variants: Vec<WordSenseVariant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordDictResult {
    #[serde(deserialize_with = "null_as_default")]
    pub entries: Vec<WordDictEntry>,
}

/// Free text shown when nothing else matched.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackText {
    pub text: String,
}

impl FallbackText {
    fn from_value(value: &Value) -> Self {
        let text = match value.get("result").and_then(Value::as_str) {
            Some(result) => result.to_string(),
            None => match value {
                Value::String(text) => text.clone(),
                other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
            },
        };
        Self { text }
    }
}

/// A response document with its shape attached.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseDocument {
    QueryIssue(QueryIssueVerdict),
    Encyclopedia(EncyclopediaResult),
    SentenceL1ToL2(SentenceL1ToL2),
    SentenceL2ToL1(SentenceL2ToL1),
    ParagraphL1ToL2(ParagraphL1ToL2),
    ParagraphL2ToL1(ParagraphL2ToL1),
    WordDict(WordDictResult),
    Fallback(FallbackText),
}

impl ResponseDocument {
    /// Classifies `value` and reads it into the matching variant.
    ///
    /// A document whose fields cannot be read into the chosen shape is shown
    /// as fallback text instead.
    pub fn from_value(value: &Value, mode: SearchMode) -> Self {
        let tag = classify(value, mode);
        let typed = match tag {
            ShapeTag::QueryIssue => query_issue(value).map(ResponseDocument::QueryIssue),
            ShapeTag::Encyclopedia => read(value, tag).map(ResponseDocument::Encyclopedia),
            ShapeTag::SentenceL1ToL2 => read(value, tag).map(ResponseDocument::SentenceL1ToL2),
            ShapeTag::SentenceL2ToL1 => read(value, tag).map(ResponseDocument::SentenceL2ToL1),
            ShapeTag::ParagraphL1ToL2 => read(value, tag).map(ResponseDocument::ParagraphL1ToL2),
            ShapeTag::ParagraphL2ToL1 => read(value, tag).map(ResponseDocument::ParagraphL2ToL1),
            ShapeTag::WordDict => read(value, tag).map(ResponseDocument::WordDict),
            ShapeTag::Fallback => None,
        };
        typed.unwrap_or_else(|| ResponseDocument::Fallback(FallbackText::from_value(value)))
    }

    pub fn shape(&self) -> ShapeTag {
        match self {
            ResponseDocument::QueryIssue(_) => ShapeTag::QueryIssue,
            ResponseDocument::Encyclopedia(_) => ShapeTag::Encyclopedia,
            ResponseDocument::SentenceL1ToL2(_) => ShapeTag::SentenceL1ToL2,
            ResponseDocument::SentenceL2ToL1(_) => ShapeTag::SentenceL2ToL1,
            ResponseDocument::ParagraphL1ToL2(_) => ShapeTag::ParagraphL1ToL2,
            ResponseDocument::ParagraphL2ToL1(_) => ShapeTag::ParagraphL2ToL1,
            ResponseDocument::WordDict(_) => ShapeTag::WordDict,
            ResponseDocument::Fallback(_) => ShapeTag::Fallback,
        }
    }
}

/// Reads an explicit `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn read<T: DeserializeOwned>(value: &Value, tag: ShapeTag) -> Option<T> {
    match T::deserialize(value) {
        Ok(typed) => Some(typed),
        Err(err) => {
            warn!(
                shape = %tag,
                error = %err,
                "document matched shape but failed to load; showing fallback"
            );
            None
        }
    }
}

/// Decides which shape `value` represents. Pure; see the module docs for the
/// order of the checks.
pub fn classify(value: &Value, mode: SearchMode) -> ShapeTag {
    let tag = if issue_status(value).is_some_and(|status| status.is_issue()) {
        ShapeTag::QueryIssue
    } else if mode == SearchMode::Encyclopedia {
        ShapeTag::Encyclopedia
    } else if is_sentence_l1_to_l2(value) {
        ShapeTag::SentenceL1ToL2
    } else if is_sentence_l2_to_l1(value) {
        ShapeTag::SentenceL2ToL1
    } else if is_paragraph_l1_to_l2(value) {
        ShapeTag::ParagraphL1ToL2
    } else if is_paragraph_l2_to_l1(value) {
        ShapeTag::ParagraphL2ToL1
    } else if is_word_dict(value) {
        ShapeTag::WordDict
    } else {
        ShapeTag::Fallback
    };
    debug!(shape = %tag, mode = mode.query_value(), "Classified response document");
    tag
}

/// The status block may sit at the top level, under `query_analysis`, or
/// (for sentence responses) under `sentence.query_analysis`.
fn status_block(value: &Value) -> Option<&Value> {
    if value.get("status").is_some_and(Value::is_string) {
        return Some(value);
    }
    value
        .get("query_analysis")
        .or_else(|| value.get("sentence").and_then(|s| s.get("query_analysis")))
        .filter(|block| block.is_object())
}

fn issue_status(value: &Value) -> Option<QueryStatus> {
    status_block(value)?
        .get("status")
        .and_then(Value::as_str)
        .and_then(QueryStatus::parse)
}

fn query_issue(value: &Value) -> Option<QueryIssueVerdict> {
    let block = status_block(value)?;
    let status = issue_status(value)?;
    let reason = block
        .get("reason_l1")
        .or_else(|| block.get("reason"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string);
    let suggestions = block
        .get("suggestion_queries")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some(QueryIssueVerdict {
        status,
        reason,
        suggestions,
    })
}

fn is_str(value: Option<&Value>) -> bool {
    value.is_some_and(Value::is_string)
}

fn is_list(value: Option<&Value>) -> bool {
    value.is_some_and(Value::is_array)
}

fn is_sentence_l1_to_l2(value: &Value) -> bool {
    let sentence = value.get("sentence");
    is_str(sentence.and_then(|s| s.get("l1_sentence")))
        && is_str(sentence.and_then(|s| s.get("main_l2_sentence")))
        && is_list(value.get("word_explanations"))
}

fn is_sentence_l2_to_l1(value: &Value) -> bool {
    let sentence = value.get("sentence");
    is_str(sentence.and_then(|s| s.get("l2_sentence")))
        && is_str(sentence.and_then(|s| s.get("main_l1_sentence")))
        && is_list(value.get("word_explanations"))
}

fn is_paragraph_l1_to_l2(value: &Value) -> bool {
    is_str(value.get("l1_paragraph")) && is_list(value.get("sentence_cards"))
}

fn is_paragraph_l2_to_l1(value: &Value) -> bool {
    is_str(value.get("l2_paragraph"))
        && is_str(value.get("paragraph_l1_translation"))
        && is_list(value.get("sentence_cards"))
}

fn is_word_dict(value: &Value) -> bool {
    value
        .get("entries")
        .and_then(Value::as_array)
        .and_then(|entries| entries.first())
        .is_some_and(|first| is_str(first.get("source_text")))
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use serde_json::json;

    fn dict(value: &Value) -> ShapeTag {
        classify(value, SearchMode::Dictionary)
    }

    #[test]
    fn classifies_each_well_formed_shape() {
        assert_eq!(dict(&word_dict()), ShapeTag::WordDict);
        assert_eq!(
            classify(&encyclopedia(), SearchMode::Encyclopedia),
            ShapeTag::Encyclopedia
        );
        assert_eq!(dict(&sentence_l1_to_l2()), ShapeTag::SentenceL1ToL2);
        assert_eq!(dict(&sentence_l2_to_l1()), ShapeTag::SentenceL2ToL1);
        assert_eq!(dict(&paragraph_l1_to_l2()), ShapeTag::ParagraphL1ToL2);
        assert_eq!(dict(&paragraph_l2_to_l1(3)), ShapeTag::ParagraphL2ToL1);
        assert_eq!(dict(&typo()), ShapeTag::QueryIssue);
        assert_eq!(dict(&json!({"result": "plain"})), ShapeTag::Fallback);
    }

    #[test]
    fn issue_status_wins_over_every_other_shape() {
        let mut doc = paragraph_l2_to_l1(2);
        doc["query_analysis"]["status"] = json!("AMBIGUOUS");
        assert_eq!(dict(&doc), ShapeTag::QueryIssue);
        assert_eq!(classify(&doc, SearchMode::Encyclopedia), ShapeTag::QueryIssue);

        let mut sentence = sentence_l2_to_l1();
        sentence["sentence"]["query_analysis"]["status"] = json!("NONSENSE");
        assert_eq!(dict(&sentence), ShapeTag::QueryIssue);
    }

    #[test]
    fn valid_or_unknown_status_is_not_an_issue() {
        let mut doc = word_dict();
        doc["status"] = json!("VALID");
        assert_eq!(dict(&doc), ShapeTag::WordDict);
        doc["status"] = json!("SOMETHING_NEW");
        assert_eq!(dict(&doc), ShapeTag::WordDict);
    }

    #[test]
    fn encyclopedia_mode_decides_without_structure() {
        assert_eq!(
            classify(&word_dict(), SearchMode::Encyclopedia),
            ShapeTag::Encyclopedia
        );
        assert_eq!(
            classify(&json!({}), SearchMode::Encyclopedia),
            ShapeTag::Encyclopedia
        );
    }

    #[test]
    fn sentence_l1_to_l2_is_tested_before_l2_to_l1() {
        let doc = json!({
            "sentence": {
                "l1_sentence": "a", "main_l2_sentence": "b",
                "l2_sentence": "c", "main_l1_sentence": "d"
            },
            "word_explanations": []
        });
        assert_eq!(dict(&doc), ShapeTag::SentenceL1ToL2);
    }

    #[test]
    fn sentence_shapes_are_tested_before_paragraphs_and_words() {
        let mut doc = sentence_l2_to_l1();
        doc["l1_paragraph"] = json!("p");
        doc["sentence_cards"] = json!([]);
        doc["entries"] = json!([{"source_text": "x", "variants": []}]);
        assert_eq!(dict(&doc), ShapeTag::SentenceL2ToL1);
    }

    #[test]
    fn paragraph_l1_to_l2_is_tested_before_l2_to_l1() {
        let doc = json!({
            "l1_paragraph": "a",
            "l2_paragraph": "b",
            "paragraph_l1_translation": "c",
            "sentence_cards": []
        });
        assert_eq!(dict(&doc), ShapeTag::ParagraphL1ToL2);
    }

    #[test]
    fn paragraph_is_tested_before_word_dict() {
        let mut doc = word_dict();
        doc["l2_paragraph"] = json!("b");
        doc["paragraph_l1_translation"] = json!("c");
        doc["sentence_cards"] = json!([]);
        assert_eq!(dict(&doc), ShapeTag::ParagraphL2ToL1);
    }

    #[test]
    fn near_misses_fall_through() {
        // word_explanations must be a list
        let mut doc = sentence_l1_to_l2();
        doc["word_explanations"] = json!("none");
        assert_eq!(dict(&doc), ShapeTag::Fallback);

        // L2->L1 paragraph needs its translation
        let mut doc = paragraph_l2_to_l1(1);
        doc.as_object_mut().unwrap().remove("paragraph_l1_translation");
        assert_eq!(dict(&doc), ShapeTag::Fallback);

        // empty entries, or a first entry without source_text
        assert_eq!(dict(&json!({"entries": []})), ShapeTag::Fallback);
        assert_eq!(dict(&json!({"entries": [{"variants": []}]})), ShapeTag::Fallback);
        assert_eq!(dict(&json!("just text")), ShapeTag::Fallback);
        assert_eq!(dict(&json!(null)), ShapeTag::Fallback);
    }

    #[test]
    fn typed_reading_picks_up_issue_details() {
        let doc = ResponseDocument::from_value(&typo(), SearchMode::Dictionary);
        let ResponseDocument::QueryIssue(verdict) = doc else {
            panic!("expected query issue");
        };
        assert_eq!(verdict.status, QueryStatus::Typo);
        assert_eq!(verdict.suggestions, vec!["appel", "apply"]);
        assert!(verdict.reason.is_some());
    }

    #[test]
    fn nested_issue_block_is_read() {
        let doc = json!({
            "query_analysis": {"status": "FACTUAL_ERROR", "reason_l1": "달은 치즈가 아닙니다."},
            "entries": []
        });
        let ResponseDocument::QueryIssue(verdict) =
            ResponseDocument::from_value(&doc, SearchMode::Dictionary)
        else {
            panic!("expected query issue");
        };
        assert_eq!(verdict.status, QueryStatus::FactualError);
        assert!(verdict.suggestions.is_empty());
    }

    #[test]
    fn typed_reading_keeps_paragraph_cards() {
        let doc = ResponseDocument::from_value(&paragraph_l2_to_l1(3), SearchMode::Dictionary);
        let ResponseDocument::ParagraphL2ToL1(paragraph) = doc else {
            panic!("expected paragraph");
        };
        assert_eq!(paragraph.sentence_cards.len(), 3);
        assert_eq!(paragraph.sentence_cards[0].sentence.main_l1_sentence, "나는 사과를 먹었다.");
    }

    #[test]
    fn null_lists_and_strings_read_as_empty() {
        let doc = json!({"input_text": "x", "key_terms": null, "simplified_explanation": "y"});
        let ResponseDocument::Encyclopedia(result) =
            ResponseDocument::from_value(&doc, SearchMode::Encyclopedia)
        else {
            panic!("expected encyclopedia");
        };
        assert!(result.key_terms.is_empty());

        let doc = json!({"entries": [{"source_text": "apple", "variants": null}]});
        let ResponseDocument::WordDict(words) =
            ResponseDocument::from_value(&doc, SearchMode::Dictionary)
        else {
            panic!("expected word dict");
        };
        assert!(words.entries[0].variants.is_empty());

        let mut doc = sentence_l1_to_l2();
        doc["word_explanations"][0]["meaning_l1"] = Value::Null;
        let ResponseDocument::SentenceL1ToL2(sentence) =
            ResponseDocument::from_value(&doc, SearchMode::Dictionary)
        else {
            panic!("expected sentence");
        };
        assert_eq!(sentence.word_explanations.unwrap()[0].meaning_l1, "");
    }

    #[test]
    fn unreadable_shape_degrades_to_fallback() {
        let mut doc = sentence_l1_to_l2();
        doc["word_explanations"] = json!([42]);
        assert_eq!(dict(&doc), ShapeTag::SentenceL1ToL2);
        let typed = ResponseDocument::from_value(&doc, SearchMode::Dictionary);
        assert_eq!(typed.shape(), ShapeTag::Fallback);
    }

    #[test]
    fn fallback_prefers_result_field() {
        let doc =
            ResponseDocument::from_value(&json!({"result": "**hi**"}), SearchMode::Dictionary);
        assert_eq!(
            doc,
            ResponseDocument::Fallback(FallbackText {
                text: "**hi**".into()
            })
        );
        let ResponseDocument::Fallback(text) =
            ResponseDocument::from_value(&json!({"other": 1}), SearchMode::Dictionary)
        else {
            panic!("expected fallback");
        };
        assert!(text.text.contains("\"other\": 1"));
    }
}
