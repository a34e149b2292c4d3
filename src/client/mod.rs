//! `pollctl` client library: API access, session persistence and the
//! state behind the command-line views.

pub mod api;
pub mod controller;
pub mod forms;
pub mod refresh;
pub mod session;
pub mod tally;

pub use api::{ApiClient, ApiError};
pub use controller::{ClientError, PollBoard, View};
pub use session::{Session, SessionStore};
