use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::IdToken;

/// A record id as the backend's JSON exposes it: the database wraps
/// the string key one level deep, so `map.id.id.String` is the value
/// the card selectors and request bodies actually use.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub id: RecordKey,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    #[serde(rename = "String")]
    pub string: String,
}

impl RecordId {
    pub fn new(key: impl Into<String>) -> Self {
        RecordId {
            id: RecordKey { string: key.into() },
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id.string
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Difficulty {
    pub display: String,
}

/// One searchable map, as returned by the search and user-songs
/// endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BeatMap {
    pub id: RecordId,
    pub song: String,
    pub artist: String,
    pub charter: String,
    pub difficulties: Vec<Difficulty>,
    #[serde(default)]
    pub image: Option<String>,
    pub download: String,
    pub upvotes: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub results: Vec<BeatMap>,
}

/// The signed-in account's profile: identity plus the unordered id
/// sets that drive card enrichment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountData {
    pub id: RecordId,
    pub upvoted: Vec<RecordId>,
    pub downloaded: Vec<RecordId>,
}

/// Body of every token-plus-map POST (upvote, unvote, download,
/// remove, delete).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRequest {
    pub firebase_token: String,
    pub map_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub firebase_token: String,
}

/// An upload as assembled from the form: the archive bytes plus the
/// name the file part is sent under.
#[derive(Clone, Debug)]
pub struct UploadForm {
    pub file_name: String,
    pub beatmap: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// The backend answered 429; the client stops and tells the user
    /// to slow down rather than retrying.
    #[error("rate limited")]
    RateLimited,
    /// Any other non-2xx answer, with the plain-text body the backend
    /// sends alongside.
    #[error("server error {status}: {message}")]
    Status { status: u16, message: String },
    /// The request never produced a response (offline, refused, ...).
    #[error("request failed: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
    /// Client-enforced upload ceiling, checked before any bytes move.
    #[error("beatmap is {size} bytes, over the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
}

impl ApiError {
    /// The user-facing text for this failure, with a caller-supplied
    /// fallback for responses that carried no message body.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            ApiError::TooLarge { .. } => self.to_string(),
            _ => fallback.to_string(),
        }
    }
}

/// The backend REST surface as the client sees it.
///
/// One implementation speaks HTTP (the `net` feature); tests supply
/// fakes that count and script calls.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResult, ApiError>;
    async fn usersongs(&self, user: &str) -> Result<SearchResult, ApiError>;
    async fn account_data(&self, token: &IdToken) -> Result<AccountData, ApiError>;
    async fn upvote(&self, token: &IdToken, map_id: &str) -> Result<(), ApiError>;
    async fn unvote(&self, token: &IdToken, map_id: &str) -> Result<(), ApiError>;
    async fn download(&self, token: &IdToken, map_id: &str) -> Result<(), ApiError>;
    async fn remove(&self, token: &IdToken, map_id: &str) -> Result<(), ApiError>;
    async fn delete(&self, token: &IdToken, map_id: &str) -> Result<(), ApiError>;
    /// Returns the redirect query string the backend answers a
    /// successful upload with.
    async fn upload(&self, token: &IdToken, form: UploadForm) -> Result<String, ApiError>;
}
