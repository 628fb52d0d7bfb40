use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};

use crate::api::{
    AccountData, ApiError, Backend, MapRequest, SearchResult, TokenRequest, UploadForm,
};
use crate::auth::IdToken;
use crate::config::SiteConfig;

/// The live site API over HTTP.
pub struct HttpBackend {
    client: Client,
    config: Arc<SiteConfig>,
}

impl HttpBackend {
    pub fn new(config: Arc<SiteConfig>) -> Self {
        HttpBackend {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base, path)
    }

    async fn checked(response: Result<Response, reqwest::Error>) -> Result<Response, ApiError> {
        let response = response.map_err(transport)?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn get_songs(&self, path: &str, query: &[(&str, &str)]) -> Result<SearchResult, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .header(ACCEPT, "application/json")
            .send()
            .await;
        Self::checked(response).await?.json().await.map_err(transport)
    }

    async fn post_map(&self, path: &str, token: &IdToken, map_id: &str) -> Result<(), ApiError> {
        let body = MapRequest {
            firebase_token: token.as_str().to_string(),
            map_id: map_id.to_string(),
        };
        let response = self.client.post(self.url(path)).json(&body).send().await;
        Self::checked(response).await.map(|_| ())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn search(&self, query: &str) -> Result<SearchResult, ApiError> {
        self.get_songs("/api/search", &[("query", query)]).await
    }

    async fn usersongs(&self, user: &str) -> Result<SearchResult, ApiError> {
        self.get_songs("/api/usersongs", &[("user", user)]).await
    }

    async fn account_data(&self, token: &IdToken) -> Result<AccountData, ApiError> {
        let body = TokenRequest {
            firebase_token: token.as_str().to_string(),
        };
        let response = self
            .client
            .post(self.url("/api/account_data"))
            .json(&body)
            .send()
            .await;
        Self::checked(response).await?.json().await.map_err(transport)
    }

    async fn upvote(&self, token: &IdToken, map_id: &str) -> Result<(), ApiError> {
        self.post_map("/api/upvote", token, map_id).await
    }

    async fn unvote(&self, token: &IdToken, map_id: &str) -> Result<(), ApiError> {
        self.post_map("/api/unvote", token, map_id).await
    }

    async fn download(&self, token: &IdToken, map_id: &str) -> Result<(), ApiError> {
        self.post_map("/api/download", token, map_id).await
    }

    async fn remove(&self, token: &IdToken, map_id: &str) -> Result<(), ApiError> {
        self.post_map("/api/remove", token, map_id).await
    }

    async fn delete(&self, token: &IdToken, map_id: &str) -> Result<(), ApiError> {
        self.post_map("/api/delete", token, map_id).await
    }

    async fn upload(&self, token: &IdToken, form: UploadForm) -> Result<String, ApiError> {
        let size = form.beatmap.len() as u64;
        let limit = self.config.max_upload_bytes;
        if size > limit {
            return Err(ApiError::TooLarge { size, limit });
        }
        let multipart = Form::new()
            .part("beatmap", Part::bytes(form.beatmap).file_name(form.file_name))
            .text("firebaseToken", token.as_str().to_string());
        let response = self
            .client
            .post(self.url("/api/upload"))
            .multipart(multipart)
            .send()
            .await;
        Self::checked(response).await?.text().await.map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(Box::new(err))
}
