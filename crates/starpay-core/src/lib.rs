// starpay-core: resource caching, page views, and pagination for the
// Starpay alert admin.
//
// Everything here sits on top of `starpay-api`; errors are that crate's
// `Error`, passed through unchanged.

pub mod cache;
pub mod dashboard;
pub mod pagination;
pub mod resource;
pub mod view;

pub use cache::{CacheKey, ResourceCache};
pub use dashboard::{Dashboard, DashboardConfig, SessionPersistence};
pub use pagination::PageItem;
pub use resource::{Accounts, AlertHistory, AlertReceivers, MutableResource, Resource, ResourceKind};
pub use view::{PageView, ViewState};

pub use starpay_api::{
    Account, AlertHistoryItem, AlertReceiver, AlertReceiverPayload, CreateAccount, Error,
    PageParams, PageResult, Record, Session, SessionError, UpdateAccount,
};
