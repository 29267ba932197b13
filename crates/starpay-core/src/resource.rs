// ── Resource descriptors ──
//
// Type-level description of each managed collection: where it lives on
// the API and which record / payload types travel over the wire.

use serde::Serialize;
use serde::de::DeserializeOwned;
use strum::{Display, EnumIter, IntoStaticStr};

use starpay_api::{
    Account, AlertHistoryItem, AlertReceiver, AlertReceiverPayload, CreateAccount, Record,
    UpdateAccount,
};

/// The managed entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ResourceKind {
    Accounts,
    AlertReceivers,
    AlertHistory,
}

impl ResourceKind {
    /// Collection path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::Accounts => "api/v1/starpay-alert/account",
            Self::AlertReceivers => "api/v1/starpay-alert/user",
            Self::AlertHistory => "api/v1/starpay-alert/alert/paginated",
        }
    }
}

/// A paginated collection the cache can list.
pub trait Resource: Send + Sync + 'static {
    const KIND: ResourceKind;

    type Item: Record + DeserializeOwned + Clone + Send + Sync + 'static;
}

/// A collection that also supports create / update / delete.
pub trait MutableResource: Resource {
    type Create: Serialize + Send + Sync;
    type Update: Serialize + Send + Sync;

    /// Path of a single record.
    fn item_path(id: &str) -> String {
        format!("{}/{id}", Self::KIND.path())
    }
}

// ── Concrete resources ───────────────────────────────────────────────

/// Operator accounts.
#[derive(Debug)]
pub struct Accounts;

impl Resource for Accounts {
    const KIND: ResourceKind = ResourceKind::Accounts;
    type Item = Account;
}

impl MutableResource for Accounts {
    type Create = CreateAccount;
    type Update = UpdateAccount;
}

/// People who receive alert notifications.
#[derive(Debug)]
pub struct AlertReceivers;

impl Resource for AlertReceivers {
    const KIND: ResourceKind = ResourceKind::AlertReceivers;
    type Item = AlertReceiver;
}

impl MutableResource for AlertReceivers {
    type Create = AlertReceiverPayload;
    type Update = AlertReceiverPayload;
}

/// Alerts that have fired. Read-only.
#[derive(Debug)]
pub struct AlertHistory;

impl Resource for AlertHistory {
    const KIND: ResourceKind = ResourceKind::AlertHistory;
    type Item = AlertHistoryItem;
}
