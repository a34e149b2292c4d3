use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::from_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PollStatus {
    Open,
    Closed,
}

impl PollStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PollStatus::Open => "OPEN",
            PollStatus::Closed => "CLOSED",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "OPEN" => PollStatus::Open,
            _ => PollStatus::Closed,
        }
    }
}

impl std::fmt::Display for PollStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Poll {
    pub id: i64,
    pub question: String,
    pub status: PollStatus,
    pub created_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub created_by: Option<i64>,
}

impl Poll {
    /// Status with expiry applied: an OPEN poll past its closing time is
    /// reported CLOSED even before the sweeper persists it.
    pub fn effective_status(&self, now: DateTime<Utc>) -> PollStatus {
        match self.status {
            PollStatus::Open if self.closes_at <= now => PollStatus::Closed,
            status => status,
        }
    }

    pub fn accepts_votes(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == PollStatus::Open
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PollRow {
    pub id: i64,
    pub question: String,
    pub status: String,
    pub created_at: i64,
    pub closes_at: i64,
    pub created_by: Option<i64>,
}

impl From<PollRow> for Poll {
    fn from(row: PollRow) -> Self {
        Poll {
            id: row.id,
            question: row.question,
            status: PollStatus::from_db(&row.status),
            created_at: from_millis(row.created_at),
            closes_at: from_millis(row.closes_at),
            created_by: row.created_by,
        }
    }
}

/// An option together with its current vote count.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PollOption {
    pub id: i64,
    pub poll_id: i64,
    pub position: i64,
    pub text: String,
    pub votes: i64,
}

/// A poll, its options in display order, and the option the viewer chose.
#[derive(Debug, Clone)]
pub struct PollView {
    pub poll: Poll,
    pub options: Vec<PollOption>,
    pub user_vote: Option<i64>,
}

/// Data for a new poll; options are already trimmed and validated.
pub struct NewPoll {
    pub question: String,
    pub options: Vec<String>,
    pub closes_at: DateTime<Utc>,
    pub created_by: i64,
}

pub struct PollChanges {
    pub question: String,
    pub options: Vec<String>,
    pub closes_at: Option<DateTime<Utc>>,
}
