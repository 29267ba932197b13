//! Account command handlers.

use secrecy::ExposeSecret;
use tabled::Tabled;

use starpay_core::{Account, CreateAccount, Dashboard, UpdateAccount};

use crate::cli::{AccountsArgs, AccountsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{confirm, read_secret, require_login, show_page};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Active")]
    active: &'static str,
}

impl From<&Account> for AccountRow {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id.clone(),
            username: a.username.clone(),
            role: a.role.clone(),
            active: if a.is_active { "yes" } else { "no" },
        }
    }
}

fn detail(a: &Account) -> String {
    format!(
        "ID:       {}\nUsername: {}\nRole:     {}\nActive:   {}",
        a.id, a.username, a.role, a.is_active
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: AccountsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let accounts = dashboard.accounts();

    match args.command {
        AccountsCommand::List(page) => {
            show_page(
                dashboard,
                accounts,
                &page,
                global,
                |a| AccountRow::from(a),
                |a| a.id.clone(),
            )
            .await
        }

        AccountsCommand::Create {
            username,
            role,
            password_stdin,
        } => {
            require_login(dashboard)?;
            let password = read_secret("Password", password_stdin)?;
            let payload = CreateAccount {
                username,
                password: password.expose_secret().to_owned(),
                role,
            };
            let created = accounts.create(&payload).await?;
            report(created.as_ref(), "Account created", global)
        }

        AccountsCommand::Update {
            id,
            username,
            role,
            active,
        } => {
            require_login(dashboard)?;
            let payload = UpdateAccount {
                username,
                role,
                is_active: active,
            };
            let updated = accounts.update(&id, &payload).await?;
            report(updated.as_ref(), "Account updated", global)
        }

        AccountsCommand::Delete { id } => {
            require_login(dashboard)?;
            if !confirm(
                &format!("Delete account '{id}'? This cannot be undone."),
                "accounts delete",
                global.yes,
            )? {
                return Ok(());
            }
            accounts.delete(&id).await?;
            if !global.quiet {
                eprintln!("Account deleted");
            }
            Ok(())
        }
    }
}

/// Print the record the server echoed back, or just a status line.
fn report(record: Option<&Account>, status: &str, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(account) = record {
        let out = output::render_single(&global.output, account, detail, |a| a.id.clone())?;
        output::print_output(&out, global.quiet);
    }
    if !global.quiet {
        eprintln!("{status}");
    }
    Ok(())
}
