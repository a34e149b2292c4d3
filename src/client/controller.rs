//! Client-side state machine: who is signed in, which view is active,
//! the latest poll list and the message shown to the user.
//!
//! Every operation either rejects locally (no request is sent) or awaits
//! exactly one mutating request followed by a full reload of the list.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use tokio::sync::watch;

use super::api::{ApiClient, ApiError};
use super::forms::{AuthForm, PollForm};
use super::refresh::{PollFeed, Refresher};
use super::session::{Session, SessionStore};
use crate::dto::PollDto;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Signup,
    Polls,
    Create,
    Edit { poll_id: i64 },
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Rejected before any request was sent.
    #[error("{0}")]
    Invalid(String),
    #[error("Not signed in")]
    SignedOut,
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: ApiError,
    },
    #[error("Session file error: {0}")]
    Storage(#[from] io::Error),
}

impl ClientError {
    fn failed(source: ApiError, fallback: &str) -> Self {
        ClientError::Failed {
            message: fallback.to_string(),
            source,
        }
    }

    /// Prefer the server's own explanation over the fallback.
    fn failed_with_server_message(source: ApiError, fallback: &str) -> Self {
        let message = source.server_message().unwrap_or(fallback).to_string();
        ClientError::Failed { message, source }
    }
}

pub struct PollBoard {
    api: ApiClient,
    store: SessionStore,
    refresh_period: Duration,
    session: Option<Session>,
    view: View,
    feed: PollFeed,
    refresher: Option<Refresher>,
    banner: Option<String>,
    pub auth_form: AuthForm,
    pub poll_form: PollForm,
}

impl PollBoard {
    pub fn new(api: ApiClient, store: SessionStore, refresh_period: Duration) -> Self {
        let (feed, _) = watch::channel(Vec::new());
        Self {
            api,
            store,
            refresh_period,
            session: None,
            view: View::Login,
            feed: Arc::new(feed),
            refresher: None,
            banner: None,
            auth_form: AuthForm::default(),
            poll_form: PollForm::default(),
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresher.as_ref().is_some_and(Refresher::is_running)
    }

    /// Snapshot of the latest poll list.
    pub fn polls(&self) -> Vec<PollDto> {
        self.feed.borrow().clone()
    }

    pub fn poll(&self, poll_id: i64) -> Option<PollDto> {
        self.feed.borrow().iter().find(|p| p.id == poll_id).cloned()
    }

    /// Receiver that sees every list the controller or the refresh task loads.
    pub fn subscribe(&self) -> watch::Receiver<Vec<PollDto>> {
        self.feed.subscribe()
    }

    pub fn show_login(&mut self) {
        self.view = View::Login;
        self.banner = None;
    }

    pub fn show_signup(&mut self) {
        self.view = View::Signup;
        self.banner = None;
    }

    pub fn show_create(&mut self) {
        self.poll_form.reset();
        self.view = View::Create;
        self.banner = None;
    }

    pub fn cancel_form(&mut self) {
        self.poll_form.reset();
        if self.session.is_some() {
            self.view = View::Polls;
        }
    }

    /// Resume a session saved by an earlier run. Returns whether one was
    /// found and is still accepted by the server.
    pub async fn restore(&mut self) -> Result<bool, ClientError> {
        let session = match self.store.load() {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(false),
            Err(e) => {
                log::warn!("Ignoring unreadable session file {}: {e}", self.store.path().display());
                return Ok(false);
            }
        };

        match self.api.list_polls(&session).await {
            Ok(polls) => {
                self.feed.send_replace(polls);
            }
            Err(e) if e.status() == Some(StatusCode::UNAUTHORIZED) => {
                log::info!("Stored session for {} has expired", session.user.email);
                self.store.clear()?;
                return Ok(false);
            }
            Err(e) => log::warn!("Failed to load polls: {e}"),
        }
        log::info!("Restored session for {}", session.user.email);
        self.begin_session(session).await;
        Ok(true)
    }

    pub async fn login(&mut self) -> Result<(), ClientError> {
        let result = self.try_login().await;
        self.settle(result)
    }

    async fn try_login(&mut self) -> Result<(), ClientError> {
        self.auth_form.check_login().map_err(ClientError::Invalid)?;
        let resp = self
            .api
            .login(self.auth_form.email.trim(), &self.auth_form.password)
            .await
            .map_err(|e| ClientError::failed(e, "Invalid email or password"))?;
        self.sign_in(Session::from(resp)).await
    }

    pub async fn signup(&mut self) -> Result<(), ClientError> {
        let result = self.try_signup().await;
        self.settle(result)
    }

    async fn try_signup(&mut self) -> Result<(), ClientError> {
        self.auth_form.check_signup().map_err(ClientError::Invalid)?;
        let resp = self
            .api
            .signup(
                self.auth_form.name.trim(),
                self.auth_form.email.trim(),
                &self.auth_form.password,
            )
            .await
            .map_err(|e| ClientError::failed_with_server_message(e, "Signup failed"))?;
        self.sign_in(Session::from(resp)).await
    }

    pub async fn logout(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.stop().await;
        }
        if let Err(e) = self.store.clear() {
            log::warn!("Failed to remove session file {}: {e}", self.store.path().display());
        }
        if let Some(session) = self.session.take() {
            log::info!("Signed out {}", session.user.email);
        }
        self.feed.send_replace(Vec::new());
        self.auth_form.clear();
        self.poll_form.reset();
        self.banner = None;
        self.view = View::Login;
    }

    /// Stop background refreshing but keep the session for the next run.
    pub async fn shutdown(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.stop().await;
        }
    }

    /// Fetch the full list. Failures are logged, never shown in the banner.
    pub async fn reload(&mut self) -> Result<(), ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::SignedOut)?;
        match self.api.list_polls(session).await {
            Ok(polls) => {
                self.feed.send_replace(polls);
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to load polls: {e}");
                Err(ClientError::failed(e, "Failed to load polls"))
            }
        }
    }

    pub async fn vote(&mut self, poll_id: i64, option_id: i64) -> Result<(), ClientError> {
        let result = match self.session.as_ref() {
            None => Err(ClientError::SignedOut),
            Some(session) => self
                .api
                .vote(session, poll_id, option_id)
                .await
                .map(drop)
                .map_err(|e| ClientError::failed_with_server_message(e, "Failed to vote")),
        };
        self.settle(result)?;
        self.reload_after_change().await;
        Ok(())
    }

    pub async fn create_poll(&mut self) -> Result<(), ClientError> {
        let result = self.try_create_poll().await;
        self.settle(result)?;
        self.poll_form.reset();
        self.view = View::Polls;
        self.reload_after_change().await;
        Ok(())
    }

    async fn try_create_poll(&mut self) -> Result<(), ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::SignedOut)?;
        let request = self
            .poll_form
            .create_request(Utc::now())
            .map_err(ClientError::Invalid)?;
        let poll = self
            .api
            .create_poll(session, &request)
            .await
            .map_err(|e| ClientError::failed(e, "Failed to create poll"))?;
        log::info!("Created poll {} '{}'", poll.id, poll.question);
        Ok(())
    }

    /// Switch to the edit view with the form prefilled from a loaded poll.
    pub fn begin_edit(&mut self, poll_id: i64) -> Result<(), ClientError> {
        let result = match self.poll(poll_id) {
            Some(poll) => {
                self.poll_form = PollForm::from_poll(&poll);
                self.view = View::Edit { poll_id };
                Ok(())
            }
            None => Err(ClientError::Invalid(format!("Poll {poll_id} is not loaded"))),
        };
        self.settle(result)
    }

    pub async fn update_poll(&mut self) -> Result<(), ClientError> {
        let result = self.try_update_poll().await;
        self.settle(result)?;
        self.poll_form.reset();
        self.view = View::Polls;
        self.reload_after_change().await;
        Ok(())
    }

    async fn try_update_poll(&mut self) -> Result<(), ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::SignedOut)?;
        let View::Edit { poll_id } = self.view else {
            return Err(ClientError::Invalid("No poll is being edited".to_string()));
        };
        let request = self.poll_form.update_request().map_err(ClientError::Invalid)?;
        self.api
            .update_poll(session, poll_id, &request)
            .await
            .map_err(|e| ClientError::failed(e, "Failed to update poll"))?;
        log::info!("Updated poll {poll_id}");
        Ok(())
    }

    pub async fn close_poll(&mut self, poll_id: i64) -> Result<(), ClientError> {
        let result = match self.session.as_ref() {
            None => Err(ClientError::SignedOut),
            Some(session) => self
                .api
                .close_poll(session, poll_id)
                .await
                .map(drop)
                .map_err(|e| ClientError::failed(e, "Failed to close poll")),
        };
        self.settle(result)?;
        self.reload_after_change().await;
        Ok(())
    }

    pub async fn delete_poll(&mut self, poll_id: i64) -> Result<(), ClientError> {
        let result = match self.session.as_ref() {
            None => Err(ClientError::SignedOut),
            Some(session) => self
                .api
                .delete_poll(session, poll_id)
                .await
                .map_err(|e| ClientError::failed(e, "Failed to delete poll")),
        };
        self.settle(result)?;
        self.reload_after_change().await;
        Ok(())
    }

    async fn sign_in(&mut self, session: Session) -> Result<(), ClientError> {
        self.store.save(&session)?;
        log::info!("Signed in as {} ({})", session.user.email, session.user.role);
        self.auth_form.clear();
        self.begin_session(session).await;
        self.reload_after_change().await;
        Ok(())
    }

    async fn begin_session(&mut self, session: Session) {
        if let Some(old) = self.refresher.take() {
            old.stop().await;
        }
        self.refresher = Some(Refresher::start(
            self.api.clone(),
            session.clone(),
            self.refresh_period,
            Arc::clone(&self.feed),
        ));
        self.session = Some(session);
        self.view = View::Polls;
        self.banner = None;
    }

    async fn reload_after_change(&mut self) {
        // Already logged by reload; the mutation itself succeeded.
        let _ = self.reload().await;
    }

    /// Record the outcome of an operation in the banner.
    fn settle(&mut self, result: Result<(), ClientError>) -> Result<(), ClientError> {
        match &result {
            Ok(()) => self.banner = None,
            Err(e) => {
                if let ClientError::Failed { source, .. } = e {
                    log::warn!("{e}: {source}");
                }
                self.banner = Some(e.to_string());
            }
        }
        result
    }
}
