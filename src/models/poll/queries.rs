use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::types::{NewPoll, Poll, PollChanges, PollOption, PollRow, PollStatus, PollView};
use crate::errors::{AppError, is_unique_violation};
use crate::models::to_millis;

const SELECT_POLLS: &str = "\
    SELECT id, question, status, created_at, closes_at, created_by \
    FROM polls \
    WHERE (?1 IS NULL OR id = ?1) \
    ORDER BY id";

const SELECT_OPTIONS: &str = "\
    SELECT o.id, o.poll_id, o.position, o.text, COUNT(v.id) AS votes \
    FROM poll_options o \
    LEFT JOIN votes v ON v.option_id = o.id \
    WHERE (?1 IS NULL OR o.poll_id = ?1) \
    GROUP BY o.id \
    ORDER BY o.poll_id, o.position";

const ALREADY_VOTED: &str = "You have already voted on this poll";

/// Write transactions take the SQLite write lock up front, so concurrent
/// writers wait on the busy timeout instead of failing their lock upgrade.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// Insert a poll and its options in one transaction. Returns the poll id.
pub async fn create(pool: &SqlitePool, new_poll: &NewPoll) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin_with(BEGIN_WRITE).await?;

    let poll_id = sqlx::query(
        "INSERT INTO polls (question, status, created_at, closes_at, created_by) \
         VALUES (?, 'OPEN', ?, ?, ?)",
    )
    .bind(&new_poll.question)
    .bind(to_millis(Utc::now()))
    .bind(to_millis(new_poll.closes_at))
    .bind(new_poll.created_by)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for (position, text) in new_poll.options.iter().enumerate() {
        sqlx::query("INSERT INTO poll_options (poll_id, position, text) VALUES (?, ?, ?)")
            .bind(poll_id)
            .bind(position as i64)
            .bind(text)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(poll_id)
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Poll>, sqlx::Error> {
    let row: Option<PollRow> = sqlx::query_as(SELECT_POLLS)
        .bind(Some(id))
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Poll::from))
}

/// All polls with tallies and the viewer's own vote, oldest first.
pub async fn list_for_viewer(
    pool: &SqlitePool,
    viewer_id: i64,
) -> Result<Vec<PollView>, sqlx::Error> {
    load_views(pool, viewer_id, None).await
}

pub async fn find_for_viewer(
    pool: &SqlitePool,
    poll_id: i64,
    viewer_id: i64,
) -> Result<Option<PollView>, sqlx::Error> {
    Ok(load_views(pool, viewer_id, Some(poll_id)).await?.into_iter().next())
}

async fn load_views(
    pool: &SqlitePool,
    viewer_id: i64,
    poll_id: Option<i64>,
) -> Result<Vec<PollView>, sqlx::Error> {
    let polls: Vec<PollRow> = sqlx::query_as(SELECT_POLLS)
        .bind(poll_id)
        .fetch_all(pool)
        .await?;
    if polls.is_empty() {
        return Ok(Vec::new());
    }

    let options: Vec<PollOption> = sqlx::query_as(SELECT_OPTIONS)
        .bind(poll_id)
        .fetch_all(pool)
        .await?;

    let votes: Vec<(i64, i64)> =
        sqlx::query_as("SELECT poll_id, option_id FROM votes WHERE user_id = ?")
            .bind(viewer_id)
            .fetch_all(pool)
            .await?;
    let user_votes: HashMap<i64, i64> = votes.into_iter().collect();

    let mut by_poll: HashMap<i64, Vec<PollOption>> = HashMap::new();
    for option in options {
        by_poll.entry(option.poll_id).or_default().push(option);
    }

    Ok(polls
        .into_iter()
        .map(|row| {
            let poll = Poll::from(row);
            PollView {
                options: by_poll.remove(&poll.id).unwrap_or_default(),
                user_vote: user_votes.get(&poll.id).copied(),
                poll,
            }
        })
        .collect())
}

/// Replace question and option list. Options are matched by text: an
/// option whose text survives keeps its id and votes, new texts are added,
/// missing texts are removed. Removing an option that holds votes is a
/// conflict, since counts only ever go down when the whole poll is deleted.
pub async fn update(
    pool: &SqlitePool,
    poll_id: i64,
    changes: &PollChanges,
) -> Result<(), AppError> {
    let mut tx = pool.begin_with(BEGIN_WRITE).await?;

    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM polls WHERE id = ?")
        .bind(poll_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Poll".to_string()));
    }

    let current: Vec<PollOption> = sqlx::query_as(SELECT_OPTIONS)
        .bind(Some(poll_id))
        .fetch_all(&mut *tx)
        .await?;

    for option in &current {
        if changes.options.iter().any(|t| t == &option.text) {
            continue;
        }
        if option.votes > 0 {
            return Err(AppError::Conflict(format!(
                "Cannot remove option '{}': it already has votes",
                option.text
            )));
        }
        sqlx::query("DELETE FROM poll_options WHERE id = ?")
            .bind(option.id)
            .execute(&mut *tx)
            .await?;
    }

    for (position, text) in changes.options.iter().enumerate() {
        match current.iter().find(|o| &o.text == text) {
            Some(existing) => {
                sqlx::query("UPDATE poll_options SET position = ? WHERE id = ?")
                    .bind(position as i64)
                    .bind(existing.id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                sqlx::query("INSERT INTO poll_options (poll_id, position, text) VALUES (?, ?, ?)")
                    .bind(poll_id)
                    .bind(position as i64)
                    .bind(text)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    sqlx::query("UPDATE polls SET question = ?, closes_at = COALESCE(?, closes_at) WHERE id = ?")
        .bind(&changes.question)
        .bind(changes.closes_at.map(to_millis))
        .bind(poll_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Mark a poll CLOSED. Returns false when no such poll exists.
pub async fn close(pool: &SqlitePool, poll_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE polls SET status = ? WHERE id = ?")
        .bind(PollStatus::Closed.as_str())
        .bind(poll_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a poll with its options and votes. Returns false when no such poll exists.
pub async fn delete(pool: &SqlitePool, poll_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM polls WHERE id = ?")
        .bind(poll_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Record one vote of `user_id` for `option_id` in `poll_id`.
pub async fn cast_vote(
    pool: &SqlitePool,
    poll_id: i64,
    option_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let mut tx = pool.begin_with(BEGIN_WRITE).await?;

    let row: Option<PollRow> = sqlx::query_as(SELECT_POLLS)
        .bind(Some(poll_id))
        .fetch_optional(&mut *tx)
        .await?;
    let poll = row
        .map(Poll::from)
        .ok_or_else(|| AppError::NotFound("Poll".to_string()))?;
    if !poll.accepts_votes(now) {
        return Err(AppError::Conflict("Poll is closed".to_string()));
    }

    let owner: Option<(i64,)> = sqlx::query_as("SELECT poll_id FROM poll_options WHERE id = ?")
        .bind(option_id)
        .fetch_optional(&mut *tx)
        .await?;
    match owner {
        Some((owner_id,)) if owner_id == poll_id => {}
        _ => return Err(AppError::Validation("Invalid option for this poll".to_string())),
    }

    let previous: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM votes WHERE poll_id = ? AND user_id = ?")
            .bind(poll_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
    if previous.is_some() {
        return Err(AppError::Conflict(ALREADY_VOTED.to_string()));
    }

    let inserted = sqlx::query(
        "INSERT INTO votes (poll_id, option_id, user_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(poll_id)
    .bind(option_id)
    .bind(user_id)
    .bind(to_millis(now))
    .execute(&mut *tx)
    .await;
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict(ALREADY_VOTED.to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    tx.commit().await?;
    Ok(())
}

/// Persist CLOSED for every OPEN poll whose closing time is at or before `now`.
/// Returns the number of polls closed.
pub async fn close_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE polls SET status = 'CLOSED' WHERE status = 'OPEN' AND closes_at <= ?")
        .bind(to_millis(now))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
