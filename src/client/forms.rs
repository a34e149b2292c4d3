//! Local form state and the checks made before any request is sent.

use chrono::{DateTime, Duration, Utc};

use crate::auth::validate::{MIN_OPTIONS, MIN_PASSWORD_LEN};
use crate::dto::{CreatePollRequest, PollDto, UpdatePollRequest};
use crate::models::user::Role;

pub const DEFAULT_DURATION_HOURS: u32 = 24;

#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl AuthForm {
    /// Role the server will most likely assign, shown while typing.
    /// Display only; the session carries whatever the server returns.
    pub fn detected_role(&self) -> Role {
        Role::hint_for_email(&self.email)
    }

    pub fn check_login(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err("Please fill in all fields".to_string());
        }
        Ok(())
    }

    pub fn check_signup(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.is_empty() || self.name.trim().is_empty() {
            return Err("Please fill in all fields".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!("Password must be at least {MIN_PASSWORD_LEN} characters"));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = AuthForm::default();
    }
}

#[derive(Debug, Clone)]
pub struct PollForm {
    pub question: String,
    options: Vec<String>,
    pub duration_hours: u32,
}

impl Default for PollForm {
    fn default() -> Self {
        Self {
            question: String::new(),
            options: vec![String::new(); MIN_OPTIONS],
            duration_hours: DEFAULT_DURATION_HOURS,
        }
    }
}

impl PollForm {
    /// Prefill from an existing poll for editing.
    pub fn from_poll(poll: &PollDto) -> Self {
        let mut options: Vec<String> = poll.options.iter().map(|o| o.text.clone()).collect();
        while options.len() < MIN_OPTIONS {
            options.push(String::new());
        }
        Self {
            question: poll.question.clone(),
            options,
            duration_hours: DEFAULT_DURATION_HOURS,
        }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn add_option(&mut self) {
        self.options.push(String::new());
    }

    /// Returns false if `index` is out of range.
    pub fn set_option(&mut self, index: usize, text: &str) -> bool {
        match self.options.get_mut(index) {
            Some(slot) => {
                *slot = text.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove an option slot; the form never drops below two slots.
    pub fn remove_option(&mut self, index: usize) -> bool {
        if self.options.len() <= MIN_OPTIONS || index >= self.options.len() {
            return false;
        }
        self.options.remove(index);
        true
    }

    /// Replace all option slots at once, padding to the minimum.
    pub fn set_options<I, S>(&mut self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        while self.options.len() < MIN_OPTIONS {
            self.options.push(String::new());
        }
    }

    fn filled_options(&self) -> Vec<String> {
        self.options
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn create_request(&self, now: DateTime<Utc>) -> Result<CreatePollRequest, String> {
        if self.question.trim().is_empty() {
            return Err("Please enter a question".to_string());
        }
        let options = self.filled_options();
        if options.len() < MIN_OPTIONS {
            return Err(format!("Please provide at least {MIN_OPTIONS} options"));
        }
        if self.duration_hours == 0 {
            return Err("Duration must be at least 1 hour".to_string());
        }
        Ok(CreatePollRequest {
            question: self.question.trim().to_string(),
            options,
            closes_at: now + Duration::hours(i64::from(self.duration_hours)),
        })
    }

    pub fn update_request(&self) -> Result<UpdatePollRequest, String> {
        let options = self.filled_options();
        if self.question.trim().is_empty() || options.len() < MIN_OPTIONS {
            return Err(format!(
                "Please provide valid question and at least {MIN_OPTIONS} options"
            ));
        }
        Ok(UpdatePollRequest {
            question: self.question.trim().to_string(),
            options,
            closes_at: None,
        })
    }

    pub fn reset(&mut self) {
        *self = PollForm::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::OptionDto;
    use crate::models::poll::PollStatus;

    #[test]
    fn admin_email_detected_while_typing() {
        let mut form = AuthForm::default();
        assert_eq!(form.detected_role(), Role::User);
        form.email = "admin@example.com".into();
        assert_eq!(form.detected_role(), Role::Admin);
    }

    #[test]
    fn short_signup_password_rejected() {
        let form = AuthForm {
            email: "bob@example.com".into(),
            password: "12345".into(),
            name: "Bob".into(),
        };
        assert_eq!(
            form.check_signup().unwrap_err(),
            "Password must be at least 6 characters"
        );
    }

    #[test]
    fn login_requires_both_fields() {
        let form = AuthForm {
            email: "bob@example.com".into(),
            ..Default::default()
        };
        assert_eq!(form.check_login().unwrap_err(), "Please fill in all fields");
    }

    #[test]
    fn new_form_has_two_slots_and_keeps_them() {
        let mut form = PollForm::default();
        assert_eq!(form.options().len(), 2);
        assert!(!form.remove_option(0));
        form.add_option();
        assert!(form.remove_option(2));
        assert_eq!(form.options().len(), 2);
    }

    #[test]
    fn create_request_needs_two_filled_options() {
        let mut form = PollForm::default();
        form.question = "Lunch?".into();
        form.set_option(0, "Pizza");
        form.set_option(1, "   ");
        assert_eq!(
            form.create_request(Utc::now()).unwrap_err(),
            "Please provide at least 2 options"
        );

        form.set_option(1, " Sushi ");
        let now = Utc::now();
        let req = form.create_request(now).unwrap();
        assert_eq!(req.options, vec!["Pizza", "Sushi"]);
        assert_eq!(req.closes_at, now + Duration::hours(24));
    }

    #[test]
    fn create_request_needs_question() {
        let mut form = PollForm::default();
        form.set_options(["a", "b"]);
        assert_eq!(
            form.create_request(Utc::now()).unwrap_err(),
            "Please enter a question"
        );
    }

    #[test]
    fn edit_prefills_from_poll() {
        let poll = PollDto {
            id: 1,
            question: "Tabs or spaces?".into(),
            status: PollStatus::Open,
            closes_at: Utc::now(),
            options: vec![
                OptionDto { id: 1, text: "Tabs".into(), votes: 2 },
                OptionDto { id: 2, text: "Spaces".into(), votes: 5 },
            ],
            has_voted: false,
            user_vote: None,
        };
        let form = PollForm::from_poll(&poll);
        assert_eq!(form.question, "Tabs or spaces?");
        assert_eq!(form.options(), ["Tabs", "Spaces"]);
        let req = form.update_request().unwrap();
        assert!(req.closes_at.is_none());
    }
}
