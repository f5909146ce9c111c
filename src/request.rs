//! Search parameters shared by the navigation URL and the endpoint body.

use std::fmt;

use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::language::LangCode;

pub const DEFAULT_FIELD: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SearchMode {
    #[default]
    #[serde(rename = "dict")]
    Dictionary,
    #[serde(rename = "encyclopedia")]
    Encyclopedia,
}

impl SearchMode {
    pub fn query_value(&self) -> &'static str {
        match self {
            SearchMode::Dictionary => "dict",
            SearchMode::Encyclopedia => "encyclopedia",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "dict" | "dictionary" => Some(SearchMode::Dictionary),
            "encyclopedia" => Some(SearchMode::Encyclopedia),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SearchMode::Dictionary => SearchMode::Encyclopedia,
            SearchMode::Encyclopedia => SearchMode::Dictionary,
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Dictionary => write!(f, "Dictionary"),
            SearchMode::Encyclopedia => write!(f, "Encyclopedia"),
        }
    }
}

/// The six navigation fields as they arrive from the result URL.
///
/// Everything is kept as raw strings; language codes are resolved against the
/// persisted pair by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub education: String,
    pub field: String,
    pub query: String,
    pub mode: String,
    pub native_lang: String,
    pub target_lang: String,
}

impl SearchParams {
    pub fn from_query_string(raw: &str) -> Self {
        let mut params = Self::default();
        for pair in raw.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value);
            match decode_component(key).as_str() {
                "education" => params.education = value,
                "field" => params.field = value,
                "query" => params.query = value,
                "mode" => params.mode = value,
                "native_lang" => params.native_lang = value,
                "target_lang" => params.target_lang = value,
                _ => {}
            }
        }
        params
    }

    pub fn to_query_string(&self) -> String {
        [
            ("education", &self.education),
            ("field", &self.field),
            ("query", &self.query),
            ("mode", &self.mode),
            ("native_lang", &self.native_lang),
            ("target_lang", &self.target_lang),
        ]
        .iter()
        .map(|(key, value)| format!("{key}={}", encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
    }

    pub fn search_mode(&self) -> SearchMode {
        SearchMode::parse(&self.mode).unwrap_or_default()
    }

    /// Same search with a different query text, used for suggestion links.
    pub fn with_query(&self, query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..self.clone()
        }
    }
}

/// Body sent to the query endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub education: String,
    pub field: String,
    pub query: String,
    pub mode: SearchMode,
    pub native_lang: LangCode,
    /// Empty in encyclopedia mode.
    #[serde(with = "optional_lang")]
    pub target_lang: Option<LangCode>,
}

impl SearchRequest {
    pub fn to_params(&self) -> SearchParams {
        SearchParams {
            education: self.education.clone(),
            field: self.field.clone(),
            query: self.query.clone(),
            mode: self.mode.query_value().to_string(),
            native_lang: self.native_lang.code().to_string(),
            target_lang: self
                .target_lang
                .map(|code| code.code().to_string())
                .unwrap_or_default(),
        }
    }
}

mod optional_lang {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::language::LangCode;

    pub fn serialize<S: Serializer>(value: &Option<LangCode>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(value.map(LangCode::code).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<LangCode>, D::Error> {
        let raw = Option::<String>::deserialize(de)?;
        Ok(raw.as_deref().and_then(LangCode::parse))
    }
}

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

fn decode_component(value: &str) -> String {
    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
