//! Command implementations for nudge CLI

mod daemon;
mod misc;
mod notify;
mod remind;

pub use daemon::*;
pub use misc::*;
pub use notify::*;
pub use remind::*;

use nudge::config::Config;
use nudge::error::Result;
use nudge::notify::TargetNotifier;
use nudge::scheduler::ReminderService;
use nudge::store::SqliteStore;

/// Service over the configured database, started and in sync with it
fn open_service(config: &Config) -> Result<ReminderService> {
    let store = SqliteStore::open()?;
    let notifier = TargetNotifier::from_config(config);
    let mut service = ReminderService::new(Box::new(store), Box::new(notifier));
    service.start()?;
    Ok(service)
}
