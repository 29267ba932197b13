//! Command dispatch and shared helpers for handlers.

pub mod accounts;
pub mod alerts;
pub mod config_cmd;
pub mod receivers;
pub mod session;

use std::io::{self, BufRead, IsTerminal};
use std::sync::Arc;

use chrono::DateTime;
use secrecy::SecretString;
use serde::Serialize;
use tabled::Tabled;

use starpay_core::{Dashboard, PageParams, Resource, ResourceCache, pagination};

use crate::cli::{Command, GlobalOpts, OutputFormat, PageArgs};
use crate::error::CliError;
use crate::output;

/// Route a command to its handler.
pub async fn dispatch(
    cmd: Command,
    dashboard: &Dashboard,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => session::login(dashboard, args, global).await,
        Command::Logout => {
            session::logout(dashboard, global);
            Ok(())
        }
        Command::Whoami => session::whoami(dashboard, global),
        Command::Accounts(args) => accounts::handle(dashboard, args, global).await,
        Command::Receivers(args) => receivers::handle(dashboard, args, global).await,
        Command::Alerts(args) => alerts::handle(dashboard, args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
    }
}

// ── Session guard ───────────────────────────────────────────────────

/// Fail fast instead of sending a request the server will reject.
pub fn require_login(dashboard: &Dashboard) -> Result<(), CliError> {
    if dashboard.session().is_authenticated() {
        Ok(())
    } else {
        Err(CliError::NotLoggedIn)
    }
}

// ── Listing ─────────────────────────────────────────────────────────

/// Fetch one page through a `PageView` and print it with a footer.
///
/// A page past the end (the collection shrank) falls back to the last one.
pub async fn show_page<R, Row>(
    dashboard: &Dashboard,
    cache: &Arc<ResourceCache<R>>,
    args: &PageArgs,
    global: &GlobalOpts,
    to_row: impl Fn(&R::Item) -> Row,
    id_fn: impl Fn(&R::Item) -> String,
) -> Result<(), CliError>
where
    R: Resource,
    R::Item: Serialize,
    Row: Tabled,
{
    require_login(dashboard)?;

    let view = dashboard.view(cache);
    let limit = args.limit.unwrap_or_else(|| view.active().limit());
    let params = PageParams::new(args.page, limit).ok_or_else(|| CliError::Validation {
        field: "page".into(),
        reason: "page and limit must be at least 1".into(),
    })?;

    let mut page = view.show(params).await?;
    if let Some(last) = view.clamp_page() {
        if !global.quiet {
            eprintln!(
                "Page {} is past the end, showing page {}",
                params.page(),
                last.page()
            );
        }
        page = view.show(last).await?;
    }

    let out = output::render_list(&global.output, &page.data, to_row, id_fn)?;
    output::print_output(&out, global.quiet);

    if matches!(global.output, OutputFormat::Table) {
        let total_pages = pagination::total_pages(page.total, limit);
        let footer = output::page_footer(
            page.page,
            total_pages,
            page.total,
            output::should_color(&global.color),
        );
        output::print_footer(&footer, global.quiet);
    }
    Ok(())
}

// ── Prompts ─────────────────────────────────────────────────────────

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(io::Error::other(e)))?;
    Ok(confirmed)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Read a secret either from the first line of stdin or from a hidden prompt.
pub fn read_secret(label: &str, from_stdin: bool) -> Result<SecretString, CliError> {
    let secret = if from_stdin {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_owned()
    } else {
        rpassword::prompt_password(format!("{label}: ")).map_err(prompt_err)?
    };

    if secret.is_empty() {
        return Err(CliError::Validation {
            field: label.to_lowercase(),
            reason: "cannot be empty".into(),
        });
    }
    Ok(SecretString::from(secret))
}

// ── Formatting ──────────────────────────────────────────────────────

/// Render a milliseconds-since-epoch string as UTC time; anything else
/// is shown as-is.
pub fn fmt_millis(raw: &str) -> String {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map_or_else(
            || raw.to_owned(),
            |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        )
}
