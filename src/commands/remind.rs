//! Reminder commands: new, list, edit, delete, export, import

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use colored::Colorize;
use inquire::Confirm;

use nudge::config::Config;
use nudge::error::{NudgeError, Result};
use nudge::reminder::{parse_frequency, ReminderFields, Snapshot, DEFAULT_FREQUENCY_MINUTES};
use nudge::scheduler::{views_of, ReminderView};
use nudge::store::{ReminderStore, SqliteStore};

use super::open_service;
use crate::utils::{format_frequency, format_local, format_time_left, parse_in, parse_when, truncate_str};

/// Resolve `--at` / `--in` to an instant
fn resolve_time(at: Option<&str>, in_duration: Option<&str>, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    if let Some(raw) = at {
        return parse_when(raw).map(Some).ok_or_else(|| {
            NudgeError::Validation(format!(
                "invalid time '{}' (use RFC3339, \"YYYY-MM-DD HH:MM\" or HH:MM)",
                raw
            ))
        });
    }
    if let Some(raw) = in_duration {
        return parse_in(raw, now).map(Some).ok_or_else(|| {
            NudgeError::Validation(format!("invalid duration '{}' (use 30m, 2h, 1d, ...)", raw))
        });
    }
    Ok(None)
}

fn resolve_until(until: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    until
        .map(|raw| {
            parse_when(raw).ok_or_else(|| NudgeError::Validation(format!("invalid end time '{}'", raw)))
        })
        .transpose()
}

fn warn_default_frequency(every: Option<&str>) {
    if let Some(raw) = every {
        if parse_frequency(raw).is_none() {
            println!(
                "  {} '{}' is not a whole number of minutes, using {}",
                "Note:".yellow(),
                raw,
                format_frequency(DEFAULT_FREQUENCY_MINUTES)
            );
        }
    }
}

/// Create a new reminder
pub fn cmd_new(
    comment: String,
    at: Option<String>,
    in_duration: Option<String>,
    every: Option<String>,
    until: Option<String>,
) -> Result<()> {
    let config = Config::load()?;

    let fields = ReminderFields {
        comment,
        datetime: resolve_time(at.as_deref(), in_duration.as_deref(), Utc::now())?,
        frequency: every,
        disable_time: resolve_until(until.as_deref())?,
    };
    // Reject bad input before touching the store
    fields.clone().into_data()?;
    warn_default_frequency(fields.frequency.as_deref());

    let mut service = open_service(&config)?;
    let key = service.create(fields)?;

    match service.get(&key) {
        Some(reminder) => {
            let data = reminder.data();
            println!("\n{}", "Reminder created!".green());
            println!("  Key: {}", key.short());
            println!("  Comment: {}", data.comment);
            println!("  Next: {}", format_local(data.datetime));
            println!("  Repeats: every {}", format_frequency(data.frequency));
            if let Some(disable_time) = data.disable_time {
                println!("  Until: {}", format_local(disable_time));
            }
        }
        None => {
            println!("\nReminder {} ended before its first fire and was removed.", key.short());
        }
    }

    Ok(())
}

/// List all reminders
pub fn cmd_list(json: bool) -> Result<()> {
    let store = SqliteStore::open()?;
    let views = views_of(&store.load()?, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        println!("\nNo reminders set.");
        println!("Create one with: nudge new \"Stand up\" --in 30m");
        return Ok(());
    }

    println!("\nReminders ({}):\n", views.len());
    for view in &views {
        print_view(view);
    }
    println!();

    Ok(())
}

fn print_view(view: &ReminderView) {
    let left = format_time_left(view.time_left());
    let left = if view.time_left_secs < 0 { left.yellow() } else { left.normal() };
    let until = view
        .disable_time
        .map(|at| format!(" | until {}", format_local(at)))
        .unwrap_or_default();

    println!(
        "  {}  {}  {} ({}) | every {}{}",
        view.key.short().dimmed(),
        truncate_str(&view.comment, 40).bold(),
        format_local(view.datetime),
        left,
        format_frequency(view.frequency),
        until
    );
}

/// Edit a reminder; unspecified fields keep their current value
#[allow(clippy::too_many_arguments)]
pub fn cmd_edit(
    reminder: String,
    comment: Option<String>,
    at: Option<String>,
    in_duration: Option<String>,
    every: Option<String>,
    until: Option<String>,
    forever: bool,
) -> Result<()> {
    if comment.is_none() && at.is_none() && in_duration.is_none() && every.is_none() && until.is_none() && !forever {
        println!("Nothing to change. See `nudge edit --help`.");
        return Ok(());
    }

    let config = Config::load()?;
    let datetime = resolve_time(at.as_deref(), in_duration.as_deref(), Utc::now())?;
    let until = resolve_until(until.as_deref())?;
    if comment.as_deref().is_some_and(|c| c.trim().is_empty()) {
        return Err(NudgeError::Validation("comment is required".into()));
    }
    warn_default_frequency(every.as_deref());

    let mut service = open_service(&config)?;
    let key = service.find(&reminder)?;
    let current = service
        .get(&key)
        .map(|r| r.data().clone())
        .ok_or_else(|| NudgeError::ReminderNotFound(reminder.clone()))?;

    let fields = ReminderFields {
        comment: comment.unwrap_or(current.comment),
        datetime: Some(datetime.unwrap_or(current.datetime)),
        frequency: Some(every.unwrap_or_else(|| current.frequency.to_string())),
        disable_time: if forever { None } else { until.or(current.disable_time) },
    };
    service.edit(&key, fields)?;

    match service.get(&key) {
        Some(updated) => println!(
            "Updated reminder {}: next {}",
            key.short(),
            format_local(updated.data().datetime)
        ),
        None => println!("Reminder {} has ended and was removed.", key.short()),
    }
    Ok(())
}

/// Delete a reminder
pub fn cmd_delete(reminder: &str, skip_confirm: bool) -> Result<()> {
    let config = Config::load()?;
    let mut service = open_service(&config)?;
    let key = service.find(reminder)?;
    let comment = service
        .get(&key)
        .map(|r| r.data().comment.clone())
        .unwrap_or_default();

    if !skip_confirm {
        let confirm = Confirm::new(&format!("Delete reminder '{}'?", comment))
            .with_default(false)
            .prompt()
            .map_err(|e| NudgeError::ConfigError(e.to_string()))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    service.delete(&key)?;
    println!("Deleted reminder: {}", comment);
    Ok(())
}

/// Export reminders to JSON keyed by reminder key
pub fn cmd_export(output: Option<PathBuf>) -> Result<()> {
    let store = SqliteStore::open()?;
    let json = serde_json::to_string_pretty(&store.load()?)?;

    match output {
        Some(path) => {
            std::fs::write(&path, json)?;
            println!("Exported to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Read an export file
fn read_export(file: &Path) -> Result<Snapshot> {
    let input = std::fs::read_to_string(file)?;
    serde_json::from_str(&input)
        .map_err(|e| NudgeError::ConfigError(format!("Invalid JSON in {}: {}", file.display(), e)))
}

/// Import reminders from an export file, keeping their keys
pub fn cmd_import(file: &Path, dry_run: bool) -> Result<()> {
    let incoming = read_export(file)?;
    if incoming.is_empty() {
        println!("No reminders to import.");
        return Ok(());
    }

    let mut store = SqliteStore::open()?;
    let existing = store.load()?;

    println!("\n{} reminder(s) to import:\n", incoming.len());
    for (key, data) in &incoming {
        let status = match data.validate() {
            Err(_) => "INVALID".red(),
            Ok(()) if existing.get(key) == Some(data) => "SAME".dimmed(),
            Ok(()) if existing.contains_key(key) => "UPDATE".yellow(),
            Ok(()) => "NEW".green(),
        };
        println!("  [{}] {} - {}", status, key.short(), truncate_str(&data.comment, 50));
    }

    if dry_run {
        println!("\n(dry-run mode - no changes made)");
        return Ok(());
    }

    let mut imported = 0;
    let mut skipped = 0;
    for (key, data) in &incoming {
        if data.validate().is_err() || existing.get(key) == Some(data) {
            skipped += 1;
            continue;
        }
        store.write(key, Some(data))?;
        imported += 1;
    }

    println!("\nImported {} reminder(s), skipped {}.", imported, skipped);
    Ok(())
}
