//! Foreground event loop: sync with the store, fire due reminders, sleep

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use colored::Colorize;
use tracing::{error, info};

use nudge::config::Config;
use nudge::error::{NudgeError, Result};
use nudge::notify::TargetNotifier;
use nudge::reminder::{ReminderData, ReminderKey};
use nudge::scheduler::{ReminderObserver, ReminderService};
use nudge::store::SqliteStore;

use crate::utils::{format_frequency, format_local};

/// Prints fires to the terminal running the daemon
struct ConsoleObserver;

impl ReminderObserver for ConsoleObserver {
    fn on_reminder_fired(&mut self, key: &ReminderKey, reminder: &ReminderData) {
        println!(
            "  [{}] {} {} (next {})",
            Local::now().format("%H:%M:%S"),
            "REMINDER".green().bold(),
            reminder.comment,
            format_local(reminder.datetime)
        );
        info!(key = %key, "next fire {}", reminder.datetime);
    }
}

/// Longest sleep before the next loop iteration
fn sleep_for(service: &ReminderService, poll_interval: Duration) -> Duration {
    service
        .time_until_next()
        .map_or(poll_interval, |until_next| until_next.min(poll_interval))
}

fn pid_path() -> PathBuf {
    Config::data_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("daemon.pid")
}

/// Run continuously until Ctrl+C
pub fn cmd_daemon() -> Result<()> {
    let config = Config::load()?;
    let store = SqliteStore::open()?;
    let notifier = TargetNotifier::from_config(&config);

    // Write PID file for daemon detection
    let pid_path = pid_path();
    if let Some(parent) = pid_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&pid_path, std::process::id().to_string());

    // Set up Ctrl+C handler - also cleans up PID file
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    let pid_path_clone = pid_path.clone();
    ctrlc::set_handler(move || {
        println!("\n\nShutting down...");
        let _ = std::fs::remove_file(&pid_path_clone);
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| NudgeError::ConfigError(format!("Failed to set Ctrl+C handler: {}", e)))?;

    println!("\nnudge daemon starting...\n");

    let mut service = ReminderService::new(Box::new(store), Box::new(notifier))
        .with_observer(ConsoleObserver);
    service.start()?;

    if service.is_empty() {
        println!("No reminders yet. Add one with `nudge new`; it will be picked up here.");
    } else {
        println!("Scheduled {} reminders:\n", service.len());
        for view in service.views() {
            println!(
                "  {} - next {} - every {}",
                view.comment,
                format_local(view.datetime),
                format_frequency(view.frequency)
            );
        }
    }
    println!("\nPress Ctrl+C to stop.\n");

    let poll_interval = config.poll_interval();
    while running.load(Ordering::SeqCst) {
        if let Err(e) = service.sync() {
            error!(error = %e, "failed to read reminder changes");
        }
        service.run_due();
        std::thread::sleep(sleep_for(&service, poll_interval));
    }

    service.shutdown();
    let _ = std::fs::remove_file(&pid_path);
    println!("Daemon stopped.");
    Ok(())
}
