pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod recurrence;
pub mod reminder;
pub mod scheduler;
pub mod store;
pub mod timer;

pub use error::{NudgeError, Result};
