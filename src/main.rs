//! nudge - recurring reminders with pluggable notifications

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nudge::cli::{Cli, Commands, NotifyCommands};
use nudge::config::Config;
use nudge::error::Result;

mod commands;
mod utils;

fn main() {
    init_logging();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("\n{}", hint);
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr; NUDGE_LOG wins over the configured level
fn init_logging() {
    let filter = EnvFilter::try_from_env("NUDGE_LOG").unwrap_or_else(|_| {
        let level = Config::load()
            .map(|config| config.log_level)
            .unwrap_or_else(|_| "info".to_string());
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Reminder management
        Commands::New {
            comment,
            at,
            r#in,
            every,
            until,
        } => commands::cmd_new(comment, at, r#in, every, until),
        Commands::List { json } => commands::cmd_list(json),
        Commands::Edit {
            reminder,
            comment,
            at,
            r#in,
            every,
            until,
            forever,
        } => commands::cmd_edit(reminder, comment, at, r#in, every, until, forever),
        Commands::Delete { reminder, yes } => commands::cmd_delete(&reminder, yes),

        Commands::Daemon => commands::cmd_daemon(),

        // Notification commands
        Commands::Notify(NotifyCommands::Set {
            desktop,
            ntfy,
            ntfy_server,
            slack,
            discord,
            gotify_server,
            gotify_token,
            command,
        }) => commands::cmd_notify_set(
            desktop, ntfy, ntfy_server, slack, discord, gotify_server, gotify_token, command,
        ),
        Commands::Notify(NotifyCommands::Show) => commands::cmd_notify_show(),
        Commands::Notify(NotifyCommands::Test) => commands::cmd_notify_test(),
        Commands::Notify(NotifyCommands::Quiet { start, end, disable }) => {
            commands::cmd_notify_quiet(start, end, disable)
        }
        Commands::Notify(NotifyCommands::Enable) => commands::cmd_notify_toggle(true),
        Commands::Notify(NotifyCommands::Disable) => commands::cmd_notify_toggle(false),

        // Miscellaneous
        Commands::Export { output } => commands::cmd_export(output),
        Commands::Import { file, dry_run } => commands::cmd_import(&file, dry_run),
        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
