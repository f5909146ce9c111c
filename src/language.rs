//! Native/target language selection with persistence.
//!
//! The pair always holds two distinct codes. Every setter restores that
//! invariant before it returns and writes the record to the injected
//! [`KeyValueStore`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::request::SearchMode;
use crate::store::KeyValueStore;

/// Key under which the pair record is persisted.
pub const STORAGE_KEY: &str = "adapdict.languagePair";

pub const DEFAULT_NATIVE: LangCode = LangCode::Ko;
pub const DEFAULT_TARGET: LangCode = LangCode::En;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LangCode {
    Ko,
    En,
    Zh,
    De,
}

impl LangCode {
    /// Supported codes in declaration order. Reassignment picks from this list.
    pub const ALL: [LangCode; 4] = [LangCode::Ko, LangCode::En, LangCode::Zh, LangCode::De];

    pub fn code(self) -> &'static str {
        match self {
            LangCode::Ko => "ko",
            LangCode::En => "en",
            LangCode::Zh => "zh",
            LangCode::De => "de",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            LangCode::Ko => "한국어",
            LangCode::En => "English",
            LangCode::Zh => "中文",
            LangCode::De => "Deutsch",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|code| code.code().eq_ignore_ascii_case(value))
    }

    /// Maps a locale tag such as `en-US` or `zh_Hans_CN` onto a supported code.
    pub fn from_locale(tag: &str) -> Option<Self> {
        let primary = tag.split(['-', '_']).next().unwrap_or_default();
        Self::parse(primary)
    }

    /// First supported code that differs from `self`.
    pub fn first_other(self) -> Self {
        Self::ALL
            .into_iter()
            .find(|code| *code != self)
            .unwrap_or(DEFAULT_TARGET)
    }

    /// Counterpart used when deriving a default target.
    pub fn complement(self) -> Self {
        if self == DEFAULT_TARGET {
            DEFAULT_NATIVE
        } else {
            DEFAULT_TARGET
        }
    }
}

impl fmt::Display for LangCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LangCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unsupported language code {s:?}"))
    }
}

/// Picks the first supported code out of an `Accept-Language`-style list.
pub fn locale_from_accept_language(header: &str) -> Option<LangCode> {
    header
        .split(',')
        .filter_map(|part| part.split(';').next())
        .find_map(LangCode::from_locale)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PairRecord")]
pub struct LanguagePair {
    native: LangCode,
    target: LangCode,
}

impl LanguagePair {
    /// Builds a pair, moving the target to the complement of `native` when the
    /// two collide.
    pub fn new(native: LangCode, target: LangCode) -> Self {
        let target = if native == target {
            native.complement()
        } else {
            target
        };
        Self { native, target }
    }

    pub fn native(&self) -> LangCode {
        self.native
    }

    pub fn target(&self) -> LangCode {
        self.target
    }

    pub fn set_native(&mut self, code: LangCode) {
        if code == self.target {
            self.target = code.first_other();
        }
        self.native = code;
    }

    pub fn set_target(&mut self, code: LangCode) {
        if code == self.native {
            self.native = code.first_other();
        }
        self.target = code;
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.native, &mut self.target);
    }

    /// Derives the pair used when nothing usable is persisted.
    pub fn default_for_locale(locale_hint: Option<&str>) -> Self {
        let native = locale_hint
            .and_then(LangCode::from_locale)
            .unwrap_or(DEFAULT_NATIVE);
        Self::new(native, DEFAULT_NATIVE.complement())
    }
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self::new(DEFAULT_NATIVE, DEFAULT_TARGET)
    }
}

/// Strict record shape. Colliding codes go through [`LanguagePair::new`].
#[derive(Deserialize)]
struct PairRecord {
    native: LangCode,
    target: LangCode,
}

impl From<PairRecord> for LanguagePair {
    fn from(record: PairRecord) -> Self {
        LanguagePair::new(record.native, record.target)
    }
}

/// Raw record shape; both fields are optional strings so that a partially
/// valid record still contributes what it can.
#[derive(Debug, Default, Deserialize)]
struct StoredPair {
    native: Option<String>,
    target: Option<String>,
}

/// The language pair bound to its persistence backend.
pub struct LanguageState<S> {
    pair: LanguagePair,
    store: S,
}

impl<S: KeyValueStore> LanguageState<S> {
    /// Loads the persisted pair, deriving defaults for anything missing.
    pub fn restore(store: S, locale_hint: Option<&str>) -> Self {
        let pair = load_pair(&store, locale_hint);
        debug!(native_lang = %pair.native, target_lang = %pair.target, "Restored language pair");
        Self { pair, store }
    }

    pub fn pair(&self) -> LanguagePair {
        self.pair
    }

    pub fn native(&self) -> LangCode {
        self.pair.native
    }

    pub fn target(&self) -> LangCode {
        self.pair.target
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn set_native(&mut self, code: LangCode) -> LanguagePair {
        self.pair.set_native(code);
        self.persist();
        self.pair
    }

    pub fn set_target(&mut self, code: LangCode) -> LanguagePair {
        self.pair.set_target(code);
        self.persist();
        self.pair
    }

    pub fn swap(&mut self) -> LanguagePair {
        self.pair.swap();
        self.persist();
        self.pair
    }

    /// Whether the target selector accepts input in `mode`.
    pub fn target_enabled(&self, mode: SearchMode) -> bool {
        mode == SearchMode::Dictionary
    }

    /// Target sent with a request. Encyclopedia requests carry none, while the
    /// stored selection stays as it was.
    pub fn submitted_target(&self, mode: SearchMode) -> Option<LangCode> {
        self.target_enabled(mode).then_some(self.pair.target)
    }

    /// Writes the current pair. Failures are logged; the in-memory pair stays
    /// authoritative.
    pub fn persist(&mut self) {
        let record = match serde_json::to_string(&self.pair) {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "failed to serialize language pair");
                return;
            }
        };
        if let Err(err) = self.store.set(STORAGE_KEY, &record) {
            warn!(error = %err, "failed to persist language pair");
        }
    }
}

fn load_pair<S: KeyValueStore>(store: &S, locale_hint: Option<&str>) -> LanguagePair {
    let defaults = LanguagePair::default_for_locale(locale_hint);
    let raw = match store.get(STORAGE_KEY) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "failed to read persisted language pair");
            None
        }
    };
    let stored = raw
        .and_then(|raw| match serde_json::from_str::<StoredPair>(&raw) {
            Ok(stored) => Some(stored),
            Err(err) => {
                warn!(error = %err, "ignoring malformed language pair record");
                None
            }
        })
        .unwrap_or_default();
    let native = stored
        .native
        .as_deref()
        .and_then(LangCode::parse)
        .unwrap_or(defaults.native);
    let target = stored
        .target
        .as_deref()
        .and_then(LangCode::parse)
        .unwrap_or(defaults.target);
    LanguagePair::new(native, target)
}
