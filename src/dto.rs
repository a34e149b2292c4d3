//! JSON bodies exchanged between the server and `pollctl`.
//!
//! Field names are camelCase on the wire; timestamps are RFC 3339 UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::poll::{PollStatus, PollView};
use crate::models::user::{Role, User};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserDto {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        UserDto {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserDto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OptionDto {
    pub id: i64,
    pub text: String,
    pub votes: i64,
}

/// A poll as seen by one viewer: `has_voted` and `user_vote` are relative
/// to the authenticated user that requested it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollDto {
    pub id: i64,
    pub question: String,
    pub status: PollStatus,
    pub closes_at: DateTime<Utc>,
    pub options: Vec<OptionDto>,
    pub has_voted: bool,
    pub user_vote: Option<i64>,
}

impl PollDto {
    /// Build the response for one viewer, reporting overdue polls as CLOSED.
    pub fn from_view(view: PollView, now: DateTime<Utc>) -> Self {
        PollDto {
            id: view.poll.id,
            status: view.poll.effective_status(now),
            closes_at: view.poll.closes_at,
            question: view.poll.question,
            options: view
                .options
                .into_iter()
                .map(|o| OptionDto {
                    id: o.id,
                    text: o.text,
                    votes: o.votes,
                })
                .collect(),
            has_voted: view.user_vote.is_some(),
            user_vote: view.user_vote,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
    pub closes_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollRequest {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closes_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_id: i64,
}

/// Body of every non-2xx response.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiErrorResponse {
    pub error: String,
}
