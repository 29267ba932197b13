//! Login, logout, and whoami.

use dialoguer::Input;
use serde::Serialize;

use starpay_core::Dashboard;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::error::CliError;
use crate::output;

use super::{prompt_err, read_secret};

#[derive(Serialize)]
struct SessionInfo {
    authenticated: bool,
    username: Option<String>,
    role: Option<String>,
}

fn detail(info: &SessionInfo) -> String {
    format!(
        "Username: {}\nRole:     {}",
        info.username.as_deref().unwrap_or("-"),
        info.role.as_deref().unwrap_or("-")
    )
}

pub async fn login(
    dashboard: &Dashboard,
    args: LoginArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let username = match args.username {
        Some(name) => name,
        None => Input::<String>::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(prompt_err)?,
    };
    let password = read_secret("Password", args.password_stdin)?;

    let session = dashboard.login(&username, &password).await?;

    if !global.quiet {
        match session.role() {
            Some(role) => eprintln!(
                "Logged in as {} ({role})",
                session.username().unwrap_or(&username)
            ),
            None => eprintln!("Logged in as {}", session.username().unwrap_or(&username)),
        }
    }
    Ok(())
}

pub fn logout(dashboard: &Dashboard, global: &GlobalOpts) {
    dashboard.logout();
    if !global.quiet {
        eprintln!("Logged out");
    }
}

pub fn whoami(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    let session = dashboard.session();
    if !session.is_authenticated() {
        return Err(CliError::NotLoggedIn);
    }

    let info = SessionInfo {
        authenticated: true,
        username: session.username().map(str::to_owned),
        role: session.role().map(str::to_owned),
    };
    let out = output::render_single(&global.output, &info, detail, |i| {
        i.username.clone().unwrap_or_default()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
