//! Text-correction (wbjc) operations
//!
//! Every call is authenticated and answers with the business mapping from
//! [`JdtClient::call`]. Word-type arguments are checked first; a bad value
//! returns a `2000` envelope without touching the network.

use common::Envelope;
use gateway::Form;
use rand::RngExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sha2::{Digest, Sha256};

use crate::client::JdtClient;
use crate::error::{Error, Result};
use crate::words::{Abilities, EMPTY_WORDS_MESSAGE, WordAction, WordEntry, WordQuery, WordStatus, WordType, join};

/// Path prefix shared by all text-correction endpoints.
pub const WBJC_PREFIX: &str = "/dataapp/api/umei/fw/open/wbjc/";

/// Per-request correlation header on correction calls.
pub const TRANSACTION_HEADER: &str = "tranctionid";

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn wbjc_path(endpoint: &str) -> String {
    format!("{WBJC_PREFIX}{endpoint}")
}

/// Hex SHA-256 of `app_id`, the unix time and four random alphanumerics.
pub(crate) fn transaction_id(app_id: &str, now: i64) -> String {
    let mut bytes = [0u8; 4];
    rand::rng().fill(&mut bytes);
    let suffix: String = bytes
        .iter()
        .map(|b| ALPHANUMERIC[*b as usize % ALPHANUMERIC.len()] as char)
        .collect();

    Sha256::digest(format!("{app_id}{now}{suffix}").as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

impl JdtClient {
    async fn wbjc(&self, endpoint: &'static str, form: Form) -> Envelope {
        self.business(endpoint, &wbjc_path(endpoint), form, HeaderMap::new()).await
    }

    async fn checked(&self, endpoint: &'static str, form: Result<Form>) -> Envelope {
        match form {
            Ok(form) => self.wbjc(endpoint, form).await,
            Err(e) => e.into(),
        }
    }

    /// Correction abilities available to this application.
    pub async fn get_correct_ability(&self) -> Envelope {
        self.wbjc("get_correct_ability", Form::new()).await
    }

    /// Proofread `text` with the given abilities.
    pub async fn article_correct_external(
        &self,
        text: &str,
        abilities: &Abilities,
        son_user_id: Option<&str>,
    ) -> Envelope {
        let form = Form::new()
            .field("text", text)
            .field("ability_ids", abilities.to_form_value())
            .optional("son_user_id", son_user_id);

        let mut headers = HeaderMap::new();
        let id = transaction_id(&self.settings().app_id, jdt_auth::now_secs());
        if let Ok(value) = HeaderValue::from_str(&id) {
            headers.insert(HeaderName::from_static(TRANSACTION_HEADER), value);
        }
        let endpoint = "article_correct_external";
        self.business(endpoint, &wbjc_path(endpoint), form, headers).await
    }

    /// Subscription and quota details of the account.
    pub async fn get_wbjc_auth_info(&self) -> Envelope {
        self.wbjc("get_wbjc_auth_info", Form::new()).await
    }

    pub async fn get_son_user(
        &self,
        page: u32,
        page_count: u32,
        search_value: Option<&str>,
    ) -> Envelope {
        let form = Form::new()
            .field("page", page)
            .field("pageCount", page_count)
            .optional("searchValue", search_value);
        self.wbjc("get_son_user", form).await
    }

    pub async fn add_son_user(&self, son_user_name: &str) -> Envelope {
        let form = Form::new().field("son_user_name", son_user_name);
        self.wbjc("add_son_user", form).await
    }

    pub async fn update_son_user(&self, son_user_id: &str, son_user_name: &str) -> Envelope {
        let form = Form::new()
            .field("update_son_user_id", son_user_id)
            .field("son_user_name", son_user_name);
        self.wbjc("update_son_user", form).await
    }

    pub async fn del_son_user(&self, son_user_id: &str) -> Envelope {
        let form = Form::new().field("del_son_user_id", son_user_id);
        self.wbjc("del_son_user", form).await
    }

    /// Page through custom words of one lexicon type (1–5).
    ///
    /// The page size goes out as `totalPage`, the field name the endpoint reads.
    pub async fn get_word_list(&self, word_type: i64, query: &WordQuery) -> Envelope {
        let form = WordType::lexicon(word_type).map(|word_type| {
            Form::new()
                .field("word_type", word_type.code())
                .field("page", query.page)
                .field("totalPage", query.page_count)
                .optional("search_word", query.search_word.as_deref())
                .optional("son_user_id", query.son_user_id.as_deref())
        });
        self.checked("get_word_list", form).await
    }

    pub async fn add_word(
        &self,
        word_type: i64,
        word_text: &str,
        word_reason: Option<&str>,
        son_user_id: Option<&str>,
    ) -> Envelope {
        let form = WordType::lexicon(word_type).map(|word_type| {
            Form::new()
                .field("word_type", word_type.code())
                .field("word_text", word_text)
                .optional("word_reason", word_reason)
                .optional("son_user_id", son_user_id)
        });
        self.checked("add_word", form).await
    }

    pub async fn edit_word(
        &self,
        detection_lexicon_id: &str,
        word_text: &str,
        word_reason: Option<&str>,
        son_user_id: Option<&str>,
    ) -> Envelope {
        let form = Form::new()
            .field("detection_lexicon_id", detection_lexicon_id)
            .field("word_text", word_text)
            .optional("word_reason", word_reason)
            .optional("son_user_id", son_user_id);
        self.wbjc("edit_word", form).await
    }

    /// Add several words in one request, sent as the `json_str` field.
    pub async fn batch_add_word(&self, words: &[WordEntry], son_user_id: Option<&str>) -> Envelope {
        self.checked("batch_add_word", batch_form(words, son_user_id))
            .await
    }

    /// Enable or disable words.
    pub async fn handle_word_status(
        &self,
        detection_lexicon_ids: &[&str],
        status: WordStatus,
        son_user_id: Option<&str>,
    ) -> Envelope {
        self.handle_word(WordAction::SetStatus(status), detection_lexicon_ids, son_user_id)
            .await
    }

    pub async fn del_word(&self, detection_lexicon_ids: &[&str], son_user_id: Option<&str>) -> Envelope {
        self.handle_word(WordAction::Delete, detection_lexicon_ids, son_user_id)
            .await
    }

    pub async fn handle_word(
        &self,
        action: WordAction,
        detection_lexicon_ids: &[&str],
        son_user_id: Option<&str>,
    ) -> Envelope {
        let mut form = Form::new()
            .field("handle_type", action.handle_type())
            .field("detection_lexicon_ids", join(detection_lexicon_ids));
        if let Some(status) = action.status() {
            form.set("status", status as u8);
        }
        self.wbjc("handle_word", form.optional("son_user_id", son_user_id))
            .await
    }

    /// Clear every word of a type, leader types (6, 7) included.
    pub async fn del_all_word(&self, word_type: i64, son_user_id: Option<&str>) -> Envelope {
        let form = WordType::clearable(word_type).map(|word_type| {
            Form::new()
                .field("word_type", word_type.code())
                .optional("son_user_id", son_user_id)
        });
        self.checked("del_all_word", form).await
    }
}

fn batch_form(words: &[WordEntry], son_user_id: Option<&str>) -> Result<Form> {
    if words.is_empty() {
        return Err(Error::Validation(EMPTY_WORDS_MESSAGE.into()));
    }
    let json_str = serde_json::to_string(words).map_err(|e| Error::Validation(e.to_string()))?;
    Ok(Form::new()
        .field("json_str", json_str)
        .optional("son_user_id", son_user_id))
}
