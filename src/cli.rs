use clap::{Parser, Subcommand, ValueEnum};

/// Shell types for completion generation
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[derive(Parser)]
#[command(name = "nudge")]
#[command(author, version, about = "Recurring reminders with pluggable notifications", long_about = None)]
#[command(after_help = r#"Examples:
  nudge new "Stand up" --in 30m --every 60          Every hour, starting in 30 minutes
  nudge new "Standup meeting" --at 09:55 --every 1d Daily at 09:55
  nudge list                                        List reminders with time left
  nudge daemon                                      Fire reminders in the foreground

Quick Start:
  1. nudge notify set --desktop
  2. nudge new "Drink water" --in 1h --every 90
  3. nudge daemon
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new reminder
    #[command(after_help = r#"Examples:
  nudge new "Stretch" --in 45m                      First fire in 45 minutes, then hourly
  nudge new "Pay rent" --at "2026-11-01 09:00" --every 1w
  nudge new "Take meds" --at 08:00 --every 12h --until "2026-12-01 00:00"
"#)]
    New {
        /// What to remind you about
        #[arg(value_name = "COMMENT")]
        comment: String,

        /// First fire time: RFC3339, "YYYY-MM-DD HH:MM" or "HH:MM"
        #[arg(long, value_name = "WHEN", conflicts_with = "in")]
        at: Option<String>,

        /// First fire after a duration (e.g., "30m", "2h", "1d")
        #[arg(long, value_name = "DURATION", conflicts_with = "at")]
        r#in: Option<String>,

        /// Repeat interval in minutes or with a unit (15m, 2h, 1d, 1w) - default 60
        #[arg(long, value_name = "FREQ")]
        every: Option<String>,

        /// Stop and delete the reminder at this time
        #[arg(long, value_name = "WHEN")]
        until: Option<String>,
    },

    /// List reminders, soonest first
    #[command(after_help = r#"Examples:
  nudge list                       Show reminders with time left
  nudge list --json                Output as JSON for scripting
  nudge list --json | jq '.[].comment'
"#)]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a reminder's fields
    #[command(after_help = r#"Examples:
  nudge edit 3fa85f64 --every 2h
  nudge edit "Stretch" --in 10m
  nudge edit 3fa85f64 --forever          Remove the end time
"#)]
    Edit {
        /// Reminder key, unique key prefix, or exact comment
        #[arg(value_name = "KEY")]
        reminder: String,

        /// New comment
        #[arg(long)]
        comment: Option<String>,

        /// New fire time: RFC3339, "YYYY-MM-DD HH:MM" or "HH:MM"
        #[arg(long, value_name = "WHEN", conflicts_with = "in")]
        at: Option<String>,

        /// Fire after a duration from now
        #[arg(long, value_name = "DURATION", conflicts_with = "at")]
        r#in: Option<String>,

        /// New repeat interval
        #[arg(long, value_name = "FREQ")]
        every: Option<String>,

        /// New end time
        #[arg(long, value_name = "WHEN", conflicts_with = "forever")]
        until: Option<String>,

        /// Never stop recurring
        #[arg(long)]
        forever: bool,
    },

    /// Delete a reminder
    Delete {
        /// Reminder key, unique key prefix, or exact comment
        #[arg(value_name = "KEY")]
        reminder: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Run continuously, firing reminders as they come due
    Daemon,

    /// Manage notification settings
    #[command(subcommand, after_help = r#"Examples:
  nudge notify set                        Interactive setup
  nudge notify set --desktop              Native desktop popups
  nudge notify set --ntfy my-reminders    Use ntfy.sh
  nudge notify set --gotify-server https://gotify.example.com --gotify-token APP_TOKEN
  nudge notify show                       Show current settings
  nudge notify test                       Send test notification
  nudge notify quiet --start 22:00 --end 08:00
  nudge notify disable                    Keep reminders running, stop notifying
"#)]
    Notify(NotifyCommands),

    /// Export reminders as JSON keyed by reminder key
    #[command(after_help = r#"Examples:
  nudge export                           Print to stdout
  nudge export --output backup.json      Save to file
"#)]
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<std::path::PathBuf>,
    },

    /// Import reminders from an export file
    #[command(after_help = r#"Examples:
  nudge import backup.json               Restore reminders, keeping their keys
  nudge import --dry-run backup.json     Preview without importing
"#)]
    Import {
        /// File produced by `nudge export`
        #[arg(value_name = "FILE")]
        file: std::path::PathBuf,

        /// Preview what would be imported without making changes
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate shell completions
    #[command(after_help = r#"Examples:
  nudge completions bash >> ~/.bashrc
  nudge completions zsh >> ~/.zshrc
  nudge completions fish > ~/.config/fish/completions/nudge.fish
"#)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
pub enum NotifyCommands {
    /// Set up notification target (interactive or via flags)
    Set {
        /// Native desktop notifications
        #[arg(long)]
        desktop: bool,

        /// ntfy topic (e.g., my-topic)
        #[arg(long)]
        ntfy: Option<String>,

        /// ntfy server (default https://ntfy.sh)
        #[arg(long, requires = "ntfy")]
        ntfy_server: Option<String>,

        /// Slack webhook URL
        #[arg(long)]
        slack: Option<String>,

        /// Discord webhook URL
        #[arg(long)]
        discord: Option<String>,

        /// Gotify server URL (e.g., https://gotify.example.com)
        #[arg(long)]
        gotify_server: Option<String>,

        /// Gotify application token
        #[arg(long)]
        gotify_token: Option<String>,

        /// Custom command to execute (payload as JSON on stdin)
        #[arg(long)]
        command: Option<String>,
    },

    /// Show current notification settings
    Show,

    /// Send a test notification
    Test,

    /// Configure quiet hours (suppress notifications during this time)
    Quiet {
        /// Start time in HH:MM format (e.g., "22:00")
        #[arg(long)]
        start: Option<String>,

        /// End time in HH:MM format (e.g., "08:00")
        #[arg(long)]
        end: Option<String>,

        /// Disable quiet hours
        #[arg(long)]
        disable: bool,
    },

    /// Turn notifications on
    Enable,

    /// Turn notifications off without removing the target
    Disable,
}
