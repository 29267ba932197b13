// Wire models for the alert admin API.
//
// Field names follow the backend's snake_case JSON. Records are treated as
// opaque by the caching layer; only `Record::id` is ever inspected.

use serde::{Deserialize, Serialize};

/// Anything the API identifies by an `id`.
pub trait Record {
    fn id(&self) -> String;
}

// ── Pagination ───────────────────────────────────────────────────────

/// One-based page number plus page size. Both are always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPageParams")]
pub struct PageParams {
    page: u32,
    limit: u32,
}

#[derive(Deserialize)]
struct RawPageParams {
    page: u32,
    limit: u32,
}

impl TryFrom<RawPageParams> for PageParams {
    type Error = String;

    fn try_from(raw: RawPageParams) -> Result<Self, Self::Error> {
        Self::new(raw.page, raw.limit)
            .ok_or_else(|| format!("page and limit must be at least 1, got {}/{}", raw.page, raw.limit))
    }
}

impl PageParams {
    pub const DEFAULT_LIMIT: u32 = 10;

    /// `None` if either value is zero.
    pub fn new(page: u32, limit: u32) -> Option<Self> {
        (page >= 1 && limit >= 1).then_some(Self { page, limit })
    }

    /// First page of the given size (a zero size is raised to 1).
    pub fn first(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Same size, different page (a zero page is raised to 1).
    pub fn with_page(self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self
        }
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::first(Self::DEFAULT_LIMIT)
    }
}

/// A page of records exactly as the server reported it.
///
/// `page` and `total` are authoritative; nothing recomputes them locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    /// Envelope status; the backend sends it as a number or a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> PageResult<T> {
    /// Number of pages implied by `total` and `limit` (at least 1).
    pub fn total_pages(&self) -> u32 {
        let limit = u64::from(self.limit.max(1));
        let pages = self.total.div_ceil(limit).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

/// The `{ data: T }` wrapper around single-record responses.
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// The `{ message }` body that accompanies error statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
}

// ── Accounts ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub role: String,
    pub is_active: bool,
}

impl Record for Account {
    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAccount {
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateAccount {
    pub username: String,
    pub role: String,
    pub is_active: bool,
}

// ── Alert receivers ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertReceiver {
    pub id: String,
    pub email: String,
    pub phone_number: String,
    pub level: u32,
    /// Milliseconds since the epoch, as a string.
    pub created_at: String,
    pub updated_at: String,
}

impl Record for AlertReceiver {
    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertReceiverPayload {
    pub email: String,
    pub phone_number: String,
    pub level: u32,
}

// ── Alert history ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertHistoryItem {
    pub id: i64,
    pub alert_name: String,
    pub alert_message: String,
    pub error_count: i64,
    pub fragment_identifier: String,
    /// `normal`, `escalate`, `escalated`, or whatever else the backend adds.
    pub alert_type: String,
    pub notification_level_used: i64,
    #[serde(default)]
    pub alert_receivers_email: Option<String>,
    #[serde(default)]
    pub alert_receivers_phone_number: Option<String>,
    pub is_sent: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub alert_sent_at: Option<String>,
    #[serde(default)]
    pub sent_alert_content: Option<String>,
}

impl Record for AlertHistoryItem {
    fn id(&self) -> String {
        self.id.to_string()
    }
}
