//! Alert receiver command handlers.

use tabled::Tabled;

use starpay_core::{AlertReceiver, AlertReceiverPayload, Dashboard};

use crate::cli::{GlobalOpts, ReceiverFields, ReceiversArgs, ReceiversCommand};
use crate::error::CliError;
use crate::output;

use super::{confirm, fmt_millis, require_login, show_page};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ReceiverRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Level")]
    level: u32,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&AlertReceiver> for ReceiverRow {
    fn from(r: &AlertReceiver) -> Self {
        Self {
            id: r.id.clone(),
            email: r.email.clone(),
            phone: r.phone_number.clone(),
            level: r.level,
            updated: fmt_millis(&r.updated_at),
        }
    }
}

fn detail(r: &AlertReceiver) -> String {
    format!(
        "ID:      {}\nEmail:   {}\nPhone:   {}\nLevel:   {}\nCreated: {}\nUpdated: {}",
        r.id,
        r.email,
        r.phone_number,
        r.level,
        fmt_millis(&r.created_at),
        fmt_millis(&r.updated_at)
    )
}

impl From<ReceiverFields> for AlertReceiverPayload {
    fn from(f: ReceiverFields) -> Self {
        Self {
            email: f.email,
            phone_number: f.phone,
            level: f.level,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: ReceiversArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let receivers = dashboard.alert_receivers();

    match args.command {
        ReceiversCommand::List(page) => {
            show_page(
                dashboard,
                receivers,
                &page,
                global,
                |r| ReceiverRow::from(r),
                |r| r.id.clone(),
            )
            .await
        }

        ReceiversCommand::Create(fields) => {
            require_login(dashboard)?;
            let created = receivers.create(&fields.into()).await?;
            report(created.as_ref(), "Alert receiver added", global)
        }

        ReceiversCommand::Update { id, fields } => {
            require_login(dashboard)?;
            let updated = receivers.update(&id, &fields.into()).await?;
            report(updated.as_ref(), "Alert receiver updated", global)
        }

        ReceiversCommand::Delete { id } => {
            require_login(dashboard)?;
            if !confirm(
                &format!("Remove alert receiver '{id}'?"),
                "receivers delete",
                global.yes,
            )? {
                return Ok(());
            }
            receivers.delete(&id).await?;
            if !global.quiet {
                eprintln!("Alert receiver removed");
            }
            Ok(())
        }
    }
}

fn report(
    record: Option<&AlertReceiver>,
    status: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(receiver) = record {
        let out = output::render_single(&global.output, receiver, detail, |r| r.id.clone())?;
        output::print_output(&out, global.quiet);
    }
    if !global.quiet {
        eprintln!("{status}");
    }
    Ok(())
}
