//! Result arithmetic and labels used when rendering a poll.

use crate::dto::{OptionDto, PollDto};
use crate::models::poll::PollStatus;
use crate::models::user::Role;

pub const LABEL_MAX_CHARS: usize = 20;

pub fn total_votes(poll: &PollDto) -> i64 {
    poll.options.iter().map(|o| o.votes.max(0)).sum()
}

/// Share of `votes` in `total`, in percent rounded to one decimal.
/// A poll without votes reports 0 for every option.
pub fn percentage(votes: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let pct = votes.max(0) as f64 * 100.0 / total as f64;
    (pct * 10.0).round() / 10.0
}

pub fn option_percentage(poll: &PollDto, option: &OptionDto) -> f64 {
    percentage(option.votes, total_votes(poll))
}

/// The option the viewer picked, if they voted.
pub fn chosen_option(poll: &PollDto) -> Option<&OptionDto> {
    let id = poll.user_vote?;
    poll.options.iter().find(|o| o.id == id)
}

/// Admins manage polls but never vote on them.
pub fn can_vote(poll: &PollDto, role: Role) -> bool {
    poll.status == PollStatus::Open && !poll.has_voted && !role.is_admin()
}

/// Results are visible once the viewer voted, when the poll is closed,
/// and always to admins.
pub fn shows_results(poll: &PollDto, role: Role) -> bool {
    poll.has_voted || poll.status == PollStatus::Closed || role.is_admin()
}

/// Chart label: at most 20 characters, then "...".
pub fn short_label(text: &str) -> String {
    match text.char_indices().nth(LABEL_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Horizontal bar of `width` cells filled in proportion to `pct`.
pub fn bar(pct: f64, width: usize) -> String {
    let filled = ((pct.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    let mut out = "#".repeat(filled);
    out.push_str(&".".repeat(width.saturating_sub(filled)));
    out
}
