//! Notification commands: set, show, test, quiet, enable, disable

use colored::Colorize;
use inquire::{Confirm, Select, Text};
use std::io::{self, Write};

use nudge::config::{Config, NotifyTarget, QuietHours};
use nudge::error::{NudgeError, Result};
use nudge::notify::{send_notification, NotificationPayload};

/// Set up notification target
#[allow(clippy::too_many_arguments)]
pub fn cmd_notify_set(
    desktop: bool,
    ntfy: Option<String>,
    ntfy_server: Option<String>,
    slack: Option<String>,
    discord: Option<String>,
    gotify_server: Option<String>,
    gotify_token: Option<String>,
    command: Option<String>,
) -> Result<()> {
    let mut config = Config::load()?;

    // Check if any direct flags were provided
    let direct_target = if desktop {
        Some(NotifyTarget::Desktop)
    } else if let Some(topic) = ntfy {
        Some(NotifyTarget::Ntfy { topic, server: ntfy_server })
    } else if let Some(webhook_url) = slack {
        Some(NotifyTarget::Slack { webhook_url })
    } else if let Some(webhook_url) = discord {
        Some(NotifyTarget::Discord { webhook_url })
    } else if gotify_server.is_some() || gotify_token.is_some() {
        // Gotify requires both server and token
        match (gotify_server, gotify_token) {
            (Some(server), Some(token)) => Some(NotifyTarget::Gotify { server, token }),
            (Some(_), None) => {
                return Err(NudgeError::ConfigError(
                    "--gotify-server requires --gotify-token".into()
                ));
            }
            (None, _) => {
                return Err(NudgeError::ConfigError(
                    "--gotify-token requires --gotify-server".into()
                ));
            }
        }
    } else {
        command.map(|command| NotifyTarget::Command { command })
    };

    if let Some(target) = direct_target {
        // Direct flag provided - no interactive prompt
        config.default_notify = Some(target);
        config.save()?;
        println!("Notification settings saved.");
    } else {
        println!("\nNotification Setup\n");

        if let Some(target) = prompt_notification_setup()? {
            config.default_notify = Some(target.clone());
            config.save()?;
            println!("\n  Notification settings saved!");
            prompt_test_notification(&target);
        } else {
            println!("\n  Notification setup cancelled.");
        }
    }

    Ok(())
}

/// Show current notification settings
pub fn cmd_notify_show() -> Result<()> {
    let config = Config::load()?;

    println!("\nNotification Settings\n");

    match &config.default_notify {
        Some(target) => {
            println!("  Target: {}", describe_notify_target(target));
        }
        None => {
            println!("  No notification target configured.");
            println!("  Run `nudge notify set` to configure notifications.");
        }
    }

    let enabled = if config.notifications_enabled {
        "enabled".green()
    } else {
        "disabled".red()
    };
    println!("  Notifications: {}", enabled);

    match &config.quiet_hours {
        Some(quiet) => {
            let status = if quiet.is_quiet_now() {
                "ACTIVE NOW".yellow()
            } else {
                "scheduled".normal()
            };
            println!("\n  Quiet hours: {} - {} ({})", quiet.start, quiet.end, status);
        }
        None => {
            println!("\n  Quiet hours: not configured");
        }
    }

    if let Ok(path) = Config::config_path() {
        println!("\n  Config file: {}", path.display());
    }

    Ok(())
}

/// Configure quiet hours
pub fn cmd_notify_quiet(start: Option<String>, end: Option<String>, disable: bool) -> Result<()> {
    let mut config = Config::load()?;

    if disable {
        config.quiet_hours = None;
        config.save()?;
        println!("Quiet hours disabled.");
        return Ok(());
    }

    let (start, end) = match (start, end) {
        (Some(s), Some(e)) => (s, e),
        (Some(_), None) | (None, Some(_)) => {
            return Err(NudgeError::ConfigError(
                "Both --start and --end are required".into()
            ));
        }
        (None, None) => {
            let start = Text::new("Quiet hours start time (HH:MM):")
                .with_default("22:00")
                .with_help_message("When to stop sending notifications")
                .prompt()
                .map_err(|e| NudgeError::ConfigError(e.to_string()))?;

            let end = Text::new("Quiet hours end time (HH:MM):")
                .with_default("08:00")
                .with_help_message("When to resume notifications")
                .prompt()
                .map_err(|e| NudgeError::ConfigError(e.to_string()))?;
            (start, end)
        }
    };

    for (label, value) in [("start", &start), ("end", &end)] {
        if chrono::NaiveTime::parse_from_str(value, "%H:%M").is_err() {
            return Err(NudgeError::ConfigError(format!(
                "Invalid {} time '{}'. Use HH:MM format (e.g., 22:00)",
                label, value
            )));
        }
    }

    config.quiet_hours = Some(QuietHours {
        start: start.clone(),
        end: end.clone(),
    });
    config.save()?;
    println!("Quiet hours set: {} to {}", start, end);
    println!("Notifications will be suppressed during this time.");

    Ok(())
}

/// Turn notifications on or off
pub fn cmd_notify_toggle(enabled: bool) -> Result<()> {
    let mut config = Config::load()?;
    config.notifications_enabled = enabled;
    config.save()?;

    if enabled {
        println!("Notifications enabled.");
        if config.default_notify.is_none() {
            println!("No target configured yet. Run `nudge notify set`.");
        }
    } else {
        println!("Notifications disabled. Reminders keep recurring silently.");
    }
    println!("A running daemon picks this up on restart.");
    Ok(())
}

/// Send a test notification
pub fn cmd_notify_test() -> Result<()> {
    let config = Config::load()?;

    match &config.default_notify {
        Some(target) => {
            println!("\nSending test notification...");
            match send_notification(target, &test_payload()) {
                Ok(()) => println!("  Test notification sent successfully!"),
                Err(e) => println!("  Failed to send notification: {}", e),
            }
        }
        None => {
            println!("\nNo notification target configured.");
            println!("Run `nudge notify set` to configure notifications.");
        }
    }

    Ok(())
}

fn test_payload() -> NotificationPayload {
    NotificationPayload::new("Test Notification", "nudge is working correctly")
}

/// Interactive notification setup prompt
pub fn prompt_notification_setup() -> Result<Option<NotifyTarget>> {
    let options = vec![
        "Desktop popup",
        "ntfy.sh (easy push notifications)",
        "Gotify (self-hosted)",
        "Slack webhook",
        "Discord webhook",
        "Custom command",
        "Skip for now",
    ];

    let choice = Select::new("Where should reminders be delivered?", options)
        .prompt()
        .map_err(|e| NudgeError::ConfigError(e.to_string()))?;

    match choice {
        "Desktop popup" => Ok(Some(NotifyTarget::Desktop)),
        "ntfy.sh (easy push notifications)" => {
            let topic = Text::new("ntfy topic name:")
                .with_default("nudge-reminders")
                .with_help_message("Get notifications at ntfy.sh/<topic> or via the ntfy app")
                .prompt()
                .map_err(|e| NudgeError::ConfigError(e.to_string()))?;

            println!("\n  Install the ntfy app and subscribe to: {}", topic);
            println!("  Or visit: https://ntfy.sh/{}", topic);

            Ok(Some(NotifyTarget::Ntfy { topic, server: None }))
        }
        "Gotify (self-hosted)" => {
            let server = Text::new("Gotify server URL:")
                .with_help_message("e.g., https://gotify.example.com")
                .prompt()
                .map_err(|e| NudgeError::ConfigError(e.to_string()))?;

            let token = Text::new("Gotify application token:")
                .with_help_message("Create an app in Gotify and copy its token")
                .prompt()
                .map_err(|e| NudgeError::ConfigError(e.to_string()))?;

            Ok(Some(NotifyTarget::Gotify { server, token }))
        }
        "Slack webhook" => {
            let url = Text::new("Slack webhook URL:")
                .with_help_message("Create at: https://api.slack.com/messaging/webhooks")
                .prompt()
                .map_err(|e| NudgeError::ConfigError(e.to_string()))?;

            Ok(Some(NotifyTarget::Slack { webhook_url: url }))
        }
        "Discord webhook" => {
            let url = Text::new("Discord webhook URL:")
                .with_help_message("Server Settings > Integrations > Webhooks")
                .prompt()
                .map_err(|e| NudgeError::ConfigError(e.to_string()))?;

            Ok(Some(NotifyTarget::Discord { webhook_url: url }))
        }
        "Custom command" => {
            let cmd = Text::new("Command to run:")
                .with_help_message("Runs via sh -c with $NUDGE_TITLE and $NUDGE_BODY set")
                .prompt()
                .map_err(|e| NudgeError::ConfigError(e.to_string()))?;

            Ok(Some(NotifyTarget::Command { command: cmd }))
        }
        _ => Ok(None),
    }
}

/// Prompt the user to test their notification settings
fn prompt_test_notification(target: &NotifyTarget) {
    let test = Confirm::new("Send a test notification now?")
        .with_default(true)
        .prompt()
        .unwrap_or(false);

    if test {
        print!("  Sending test... ");
        let _ = io::stdout().flush();

        match send_notification(target, &test_payload()) {
            Ok(_) => println!("{}", "Success!".green()),
            Err(e) => {
                println!("{}", "Failed".red());
                println!("  Error: {}", e);
                println!("\n  Check your settings and try again with `nudge notify set`");
            }
        }
    }
}

/// Get a human-readable description of a notification target
pub fn describe_notify_target(target: &NotifyTarget) -> String {
    match target {
        NotifyTarget::Desktop => "Desktop popup".to_string(),
        NotifyTarget::Ntfy { topic, server } => {
            let host = server.as_deref().unwrap_or("ntfy.sh");
            format!("ntfy ({}/{})", host.trim_end_matches('/'), topic)
        }
        NotifyTarget::Slack { webhook_url } => {
            format!("Slack ({}...)", webhook_url.chars().take(50).collect::<String>())
        }
        NotifyTarget::Discord { webhook_url } => {
            format!("Discord ({}...)", webhook_url.chars().take(50).collect::<String>())
        }
        NotifyTarget::Gotify { server, token: _ } => {
            format!("Gotify ({})", server)
        }
        NotifyTarget::Command { command } => {
            format!("Command: {}", command)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_notify_target() {
        assert_eq!(describe_notify_target(&NotifyTarget::Desktop), "Desktop popup");
        assert_eq!(
            describe_notify_target(&NotifyTarget::Ntfy { topic: "meds".into(), server: None }),
            "ntfy (ntfy.sh/meds)"
        );
        assert_eq!(
            describe_notify_target(&NotifyTarget::Ntfy {
                topic: "meds".into(),
                server: Some("https://push.example.com/".into())
            }),
            "ntfy (https://push.example.com/meds)"
        );
        let long = format!("https://hooks.slack.com/services/{}", "x".repeat(80));
        assert_eq!(describe_notify_target(&NotifyTarget::Slack { webhook_url: long }).len(), "Slack (...)".len() + 50);
    }
}
