use std::sync::Arc;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::session::Session;
use crate::dto::{
    AuthResponse, CreatePollRequest, LoginRequest, PollDto, SignupRequest, UpdatePollRequest,
    VoteRequest,
};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Failure of one API call.
///
/// Every endpoint reports errors the same way: either no usable HTTP
/// exchange happened (`Transport`), or the server answered non-2xx
/// (`Rejected`) with an optional human-readable message taken from the
/// body's `error`/`message` field, or from a plain-text body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Rejected {
        status: StatusCode,
        message: Option<String>,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
        }
    }

    /// The message the server put in the error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => message.as_deref(),
            ApiError::Transport(_) => None,
        }
    }
}

/// Pull a human-readable message out of an error body.
pub fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let message = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ["error", "message"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        Ok(Value::String(s)) => Some(s),
        Ok(_) => None,
        Err(_) => Some(trimmed.to_string()),
    };
    message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty())
}

/// HTTP client for the poll API.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Arc<str>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        builder.bearer_auth(&session.token)
    }

    /// Send and turn any non-2xx status into `ApiError::Rejected`.
    async fn send(builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Rejected {
            status,
            message: error_message(&body),
        })
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        Ok(Self::send(builder).await?.json::<T>().await?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        log::debug!("POST /auth/login for {email}");
        Self::send_json(self.client.post(self.url("/auth/login")).json(&body)).await
    }

    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let body = SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        log::debug!("POST /auth/signup for {email}");
        Self::send_json(self.client.post(self.url("/auth/signup")).json(&body)).await
    }

    pub async fn list_polls(&self, session: &Session) -> Result<Vec<PollDto>, ApiError> {
        let req = self.authed(self.client.get(self.url("/polls")), session);
        Self::send_json(req).await
    }

    pub async fn get_poll(&self, session: &Session, poll_id: i64) -> Result<PollDto, ApiError> {
        let req = self.authed(self.client.get(self.url(&format!("/polls/{poll_id}"))), session);
        Self::send_json(req).await
    }

    pub async fn create_poll(
        &self,
        session: &Session,
        poll: &CreatePollRequest,
    ) -> Result<PollDto, ApiError> {
        let req = self.authed(self.client.post(self.url("/polls")).json(poll), session);
        Self::send_json(req).await
    }

    pub async fn update_poll(
        &self,
        session: &Session,
        poll_id: i64,
        poll: &UpdatePollRequest,
    ) -> Result<PollDto, ApiError> {
        let req = self
            .client
            .put(self.url(&format!("/polls/{poll_id}")))
            .json(poll);
        Self::send_json(self.authed(req, session)).await
    }

    pub async fn close_poll(&self, session: &Session, poll_id: i64) -> Result<PollDto, ApiError> {
        let req = self.client.post(self.url(&format!("/polls/{poll_id}/close")));
        Self::send_json(self.authed(req, session)).await
    }

    pub async fn vote(
        &self,
        session: &Session,
        poll_id: i64,
        option_id: i64,
    ) -> Result<PollDto, ApiError> {
        let req = self
            .client
            .post(self.url(&format!("/polls/{poll_id}/vote")))
            .json(&VoteRequest { option_id });
        Self::send_json(self.authed(req, session)).await
    }

    pub async fn delete_poll(&self, session: &Session, poll_id: i64) -> Result<(), ApiError> {
        let req = self.client.delete(self.url(&format!("/polls/{poll_id}")));
        Self::send(self.authed(req, session)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_field_wins() {
        assert_eq!(
            error_message(r#"{"error": "You have already voted on this poll"}"#).as_deref(),
            Some("You have already voted on this poll")
        );
        assert_eq!(
            error_message(r#"{"message": "Poll is closed"}"#).as_deref(),
            Some("Poll is closed")
        );
    }

    #[test]
    fn plain_text_body_is_the_message() {
        assert_eq!(error_message("  Email already exists\n").as_deref(), Some("Email already exists"));
    }

    #[test]
    fn empty_or_unhelpful_bodies_have_no_message() {
        assert_eq!(error_message(""), None);
        assert_eq!(error_message("   "), None);
        assert_eq!(error_message(r#"{"status": 500}"#), None);
        assert_eq!(error_message(r#"{"error": ""}"#), None);
        assert_eq!(error_message("[1, 2]"), None);
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = ApiClient::new("http://localhost:8080/api/");
        assert_eq!(client.base_url(), "http://localhost:8080/api");
        assert_eq!(client.url("/polls"), "http://localhost:8080/api/polls");
    }

    #[test]
    fn rejected_display_includes_message() {
        let err = ApiError::Rejected {
            status: StatusCode::CONFLICT,
            message: Some("Poll is closed".into()),
        };
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
        assert_eq!(err.server_message(), Some("Poll is closed"));
        assert!(err.to_string().contains("Poll is closed"));
    }
}
