//! Alert history handlers.

use tabled::Tabled;

use starpay_core::{AlertHistoryItem, Dashboard};

use crate::cli::{AlertsArgs, AlertsCommand, GlobalOpts};
use crate::error::CliError;

use super::{fmt_millis, show_page};

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Alert")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Errors")]
    errors: i64,
    #[tabled(rename = "Level")]
    level: i64,
    #[tabled(rename = "Sent To")]
    sent_to: String,
    #[tabled(rename = "Sent")]
    sent: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&AlertHistoryItem> for AlertRow {
    fn from(a: &AlertHistoryItem) -> Self {
        let sent_to = [
            a.alert_receivers_email.as_deref(),
            a.alert_receivers_phone_number.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");

        Self {
            id: a.id,
            name: a.alert_name.clone(),
            kind: a.alert_type.clone(),
            errors: a.error_count,
            level: a.notification_level_used,
            sent_to,
            sent: match (&a.alert_sent_at, a.is_sent) {
                (Some(at), true) => fmt_millis(at),
                (None, true) => "yes".into(),
                (_, false) => "no".into(),
            },
            created: fmt_millis(&a.created_at),
        }
    }
}

pub async fn handle(
    dashboard: &Dashboard,
    args: AlertsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        AlertsCommand::List(page) => {
            show_page(
                dashboard,
                dashboard.alert_history(),
                &page,
                global,
                |a| AlertRow::from(a),
                |a| a.id.to_string(),
            )
            .await
        }
    }
}
