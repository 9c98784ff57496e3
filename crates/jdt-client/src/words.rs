//! Closed value sets for the custom-word endpoints
//!
//! Word types arrive from callers as plain integers and are checked here,
//! before any request is built, so an invalid value never reaches the
//! network.

use serde::Serialize;

use crate::error::{Error, Result};

/// Message for a word type outside the allowed set.
pub const INVALID_WORD_TYPE_MESSAGE: &str = "自定义词类型错误";

/// Message for an empty batch of words.
pub const EMPTY_WORDS_MESSAGE: &str = "自定义词不允许为空";

/// Every correction ability, sent when the caller asks for `Abilities::All`.
pub const ALL_ABILITY_IDS: &str = "9,31,32,35,34,39,36,20,21,24,23,45,44,48,101,19,124,8,122,240,6,46,42,105,109,112,111,108,118,38,119,241,47,49,3001";

/// Custom word categories.
///
/// Types 1–5 are lexicon words. 6 and 7 hold leader titles and ordering and
/// can only be cleared, not listed or added one by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordType {
    Forbidden = 1,
    Sensitive = 2,
    Correct = 3,
    Wrong = 4,
    Key = 5,
    LeaderTitle = 6,
    LeaderOrder = 7,
}

impl WordType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(WordType::Forbidden),
            2 => Some(WordType::Sensitive),
            3 => Some(WordType::Correct),
            4 => Some(WordType::Wrong),
            5 => Some(WordType::Key),
            6 => Some(WordType::LeaderTitle),
            7 => Some(WordType::LeaderOrder),
            _ => None,
        }
    }

    /// Types accepted by list/add (1–5).
    pub fn lexicon(code: i64) -> Result<Self> {
        match Self::from_code(code) {
            Some(t) if t.code() <= 5 => Ok(t),
            _ => Err(Error::Validation(INVALID_WORD_TYPE_MESSAGE.into())),
        }
    }

    /// Types accepted by clear-all (1–7).
    pub fn clearable(code: i64) -> Result<Self> {
        Self::from_code(code).ok_or_else(|| Error::Validation(INVALID_WORD_TYPE_MESSAGE.into()))
    }
}

impl Serialize for WordType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

/// Enabled/disabled state of a lexicon word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordStatus {
    Enabled = 1,
    Disabled = 2,
}

/// Bulk operation on existing lexicon words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordAction {
    SetStatus(WordStatus),
    Delete,
}

impl WordAction {
    /// Wire value of `handle_type`.
    pub fn handle_type(self) -> u8 {
        match self {
            WordAction::SetStatus(_) => 2,
            WordAction::Delete => 3,
        }
    }

    pub fn status(self) -> Option<WordStatus> {
        match self {
            WordAction::SetStatus(status) => Some(status),
            WordAction::Delete => None,
        }
    }
}

/// Abilities to run in a correction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Abilities {
    All,
    Ids(Vec<u32>),
}

impl Abilities {
    pub fn to_form_value(&self) -> String {
        match self {
            Abilities::All => ALL_ABILITY_IDS.to_string(),
            Abilities::Ids(ids) => join(ids),
        }
    }
}

/// One entry of a batch add. Serialized into the `json_str` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordEntry {
    pub word_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_reason: Option<String>,
    pub word_type: WordType,
}

impl WordEntry {
    pub fn new(word_type: WordType, word_text: impl Into<String>) -> Self {
        Self {
            word_text: word_text.into(),
            word_reason: None,
            word_type,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.word_reason = Some(reason.into());
        self
    }
}

/// Paging and filters for the word list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordQuery {
    pub page: u32,
    pub page_count: u32,
    pub search_word: Option<String>,
    pub son_user_id: Option<String>,
}

impl Default for WordQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_count: 10,
            search_word: None,
            son_user_id: None,
        }
    }
}

/// Comma-separated list, the gateway's format for id lists.
pub(crate) fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
