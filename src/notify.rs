use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, NotifyTarget, QuietHours};
use crate::error::{NudgeError, Result};

/// Upper bound on a single webhook request
const HTTP_TIMEOUT_SECS: u64 = 15;

/// Shared HTTP agent for all webhook targets
static HTTP_AGENT: Lazy<ureq::Agent> = Lazy::new(|| {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
        .build()
        .into()
});

/// Outcome of asking the user whether notifications may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet, or nothing to deliver to
    Default,
}

/// Notification gateway consumed by the scheduler
pub trait Notifier {
    fn request_permission(&mut self) -> Permission;

    fn permission(&self) -> Permission;

    /// Present a message without blocking the caller on delivery.
    /// Callers check [`Notifier::permission`] first.
    fn show(&self, title: &str, body: &str) -> Result<()>;
}

/// Notification payload sent to all targets
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl NotificationPayload {
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            sent_at: Utc::now(),
        }
    }
}

/// Delivers to the target configured in [`Config`]
#[derive(Debug, Clone)]
pub struct TargetNotifier {
    target: Option<NotifyTarget>,
    enabled: bool,
    quiet_hours: Option<QuietHours>,
    permission: Permission,
    log_path: Option<PathBuf>,
}

impl TargetNotifier {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target: config.default_notify.clone(),
            enabled: config.notifications_enabled,
            quiet_hours: config.quiet_hours.clone(),
            permission: Permission::Default,
            log_path: Config::data_dir().ok().map(|dir| dir.join("notifications.log")),
        }
    }

    /// Skip the notifications.log file
    pub fn without_log(mut self) -> Self {
        self.log_path = None;
        self
    }

    pub fn target(&self) -> Option<&NotifyTarget> {
        self.target.as_ref()
    }

    fn is_quiet_now(&self) -> bool {
        self.quiet_hours.as_ref().is_some_and(|q| q.is_quiet_now())
    }
}

impl Notifier for TargetNotifier {
    fn request_permission(&mut self) -> Permission {
        self.permission = match (&self.target, self.enabled) {
            (_, false) => Permission::Denied,
            (None, true) => Permission::Default,
            (Some(_), true) => Permission::Granted,
        };
        debug!(permission = ?self.permission, "notification permission resolved");
        self.permission
    }

    fn permission(&self) -> Permission {
        self.permission
    }

    fn show(&self, title: &str, body: &str) -> Result<()> {
        let target = match (&self.target, self.permission) {
            (Some(target), Permission::Granted) => target,
            _ => {
                return Err(NudgeError::NotificationError(format!(
                    "permission is {:?}",
                    self.permission
                )))
            }
        };

        let payload = NotificationPayload::new(title, body);

        if self.is_quiet_now() {
            info!(title, "notification suppressed by quiet hours");
            self.log_notification(&payload, "QUIET_HOURS_SUPPRESSED");
            return Ok(());
        }

        self.log_notification(&payload, target_name(target));
        deliver_in_background(target.clone(), payload)
    }
}

impl TargetNotifier {
    /// Append to notifications.log for later review
    fn log_notification(&self, payload: &NotificationPayload, target_type: &str) {
        let Some(log_path) = &self.log_path else {
            return;
        };
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
            let _ = file.write_all(format_log_entry(payload, target_type).as_bytes());
        }
    }
}

fn format_log_entry(payload: &NotificationPayload, target_type: &str) -> String {
    format!(
        "{} | {} | {}: {}\n",
        payload.sent_at.format("%Y-%m-%d %H:%M:%S UTC"),
        target_type,
        payload.title,
        payload.body.replace('\n', " "),
    )
}

/// Send on a detached thread so a slow target never holds up the event loop.
/// Failures are logged from that thread.
fn deliver_in_background(target: NotifyTarget, payload: NotificationPayload) -> Result<()> {
    std::thread::Builder::new()
        .name("nudge-notify".into())
        .spawn(move || {
            let kind = target_name(&target);
            match send_notification(&target, &payload) {
                Ok(()) => debug!(kind, "notification delivered"),
                Err(e) => warn!(kind, error = %e, "notification delivery failed"),
            }
        })?;
    Ok(())
}

/// Short name used in logs
pub fn target_name(target: &NotifyTarget) -> &'static str {
    match target {
        NotifyTarget::Desktop => "desktop",
        NotifyTarget::Command { .. } => "command",
        NotifyTarget::Ntfy { .. } => "ntfy",
        NotifyTarget::Slack { .. } => "slack",
        NotifyTarget::Discord { .. } => "discord",
        NotifyTarget::Gotify { .. } => "gotify",
    }
}

/// Send a notification to the specified target, ignoring permission and quiet hours
pub fn send_notification(target: &NotifyTarget, payload: &NotificationPayload) -> Result<()> {
    match target {
        NotifyTarget::Desktop => send_desktop(payload),
        NotifyTarget::Command { command } => send_command(command, payload),
        NotifyTarget::Ntfy { topic, server } => send_ntfy(topic, server.as_deref(), payload),
        NotifyTarget::Slack { webhook_url } => send_slack(webhook_url, payload),
        NotifyTarget::Discord { webhook_url } => send_discord(webhook_url, payload),
        NotifyTarget::Gotify { server, token } => send_gotify(server, token, payload),
    }
}

/// Native popup via the platform's notification helper
fn send_desktop(payload: &NotificationPayload) -> Result<()> {
    #[cfg(target_os = "macos")]
    let output = Command::new("osascript")
        .arg("-e")
        .arg(format!(
            "display notification {} with title {}",
            applescript_quote(&payload.body),
            applescript_quote(&payload.title)
        ))
        .output()?;

    #[cfg(not(target_os = "macos"))]
    let output = Command::new("notify-send")
        .args(["--app-name=nudge", payload.title.as_str(), payload.body.as_str()])
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NudgeError::NotificationError(format!(
            "Desktop notification failed: {}",
            stderr.trim()
        )));
    }
    Ok(())
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn applescript_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Send notification via custom command (JSON on stdin)
fn send_command(command: &str, payload: &NotificationPayload) -> Result<()> {
    let json = serde_json::to_string(payload)?;

    let mut child = Command::new("sh")
        .args(["-c", command])
        .env("NUDGE_TITLE", &payload.title)
        .env("NUDGE_BODY", &payload.body)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(ref mut stdin) = child.stdin {
        stdin.write_all(json.as_bytes())?;
    }

    let output = child.wait_with_output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NudgeError::NotificationError(format!(
            "Command failed: {}",
            stderr
        )));
    }

    Ok(())
}

/// Send notification via ntfy
fn send_ntfy(topic: &str, server: Option<&str>, payload: &NotificationPayload) -> Result<()> {
    let server = server.unwrap_or("https://ntfy.sh");
    let url = format!("{}/{}", server.trim_end_matches('/'), topic);

    HTTP_AGENT.post(&url)
        .header("Title", &payload.title)
        .header("Priority", "default")
        .header("Tags", "alarm_clock")
        .send(&payload.body)?;

    Ok(())
}

/// Send notification via Slack webhook
fn send_slack(webhook_url: &str, payload: &NotificationPayload) -> Result<()> {
    let slack_payload = serde_json::json!({
        "text": format!("*{}*\n{}", payload.title, payload.body),
    });

    HTTP_AGENT.post(webhook_url)
        .header("Content-Type", "application/json")
        .send_json(&slack_payload)?;

    Ok(())
}

/// Send notification via Discord webhook
fn send_discord(webhook_url: &str, payload: &NotificationPayload) -> Result<()> {
    let discord_payload = serde_json::json!({
        "embeds": [
            {
                "title": payload.title,
                "description": payload.body,
                "color": 15105570,
                "timestamp": payload.sent_at.to_rfc3339(),
                "footer": {
                    "text": "nudge"
                }
            }
        ]
    });

    HTTP_AGENT.post(webhook_url)
        .header("Content-Type", "application/json")
        .send_json(&discord_payload)?;

    Ok(())
}

/// Send notification via Gotify
fn send_gotify(server: &str, token: &str, payload: &NotificationPayload) -> Result<()> {
    let url = format!("{}/message?token={}", server.trim_end_matches('/'), token);

    let gotify_payload = serde_json::json!({
        "title": payload.title,
        "message": payload.body,
        "priority": 5,
    });

    HTTP_AGENT.post(&url)
        .header("Content-Type", "application/json")
        .send_json(&gotify_payload)?;

    Ok(())
}
