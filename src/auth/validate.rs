use chrono::{DateTime, Utc};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_QUESTION_LEN: usize = 500;
pub const MAX_OPTION_LEN: usize = 200;
pub const MAX_NAME_LEN: usize = 100;

/// Validate a display name: required, at most 100 chars.
pub fn validate_name(name: &str) -> Option<String> {
    validate_required(name, "Name", MAX_NAME_LEN)
}

/// Validate an email: must contain '@' and '.', max 254 chars.
pub fn validate_email(email: &str) -> Option<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Some("Email is required".to_string());
    }
    if trimmed.len() > 254 {
        return Some("Email must be at most 254 characters".to_string());
    }
    if !trimmed.contains('@') || !trimmed.contains('.') {
        return Some("Email must be a valid address (contain '@' and '.')".to_string());
    }
    None
}

/// Validate a password: min 6 chars.
pub fn validate_password(password: &str) -> Option<String> {
    if password.is_empty() {
        return Some("Password is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Some(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    None
}

pub fn validate_question(question: &str) -> Option<String> {
    validate_required(question, "Question", MAX_QUESTION_LEN)
}

/// Trim options and drop blank ones. Returns the cleaned list, or an error
/// when fewer than two remain, one is too long, or two are identical.
pub fn clean_options(options: &[String]) -> Result<Vec<String>, String> {
    let cleaned: Vec<String> = options
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();

    if cleaned.len() < MIN_OPTIONS {
        return Err(format!("Please provide at least {MIN_OPTIONS} options"));
    }
    if let Some(long) = cleaned.iter().find(|o| o.chars().count() > MAX_OPTION_LEN) {
        return Err(format!(
            "Option '{}' must be at most {MAX_OPTION_LEN} characters",
            long.chars().take(20).collect::<String>()
        ));
    }
    for (i, option) in cleaned.iter().enumerate() {
        if cleaned[..i].contains(option) {
            return Err(format!("Option '{option}' appears more than once"));
        }
    }
    Ok(cleaned)
}

/// A new poll must close in the future.
pub fn validate_closes_at(closes_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<String> {
    if closes_at <= now {
        return Some("Closing time must be in the future".to_string());
    }
    None
}

/// Validate a required text field with a max length.
pub fn validate_required(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(format!("{field_name} is required"));
    }
    if trimmed.chars().count() > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}
