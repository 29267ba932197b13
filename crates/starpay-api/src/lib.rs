// starpay-api: session store, request pipeline, and wire models for the
// Starpay alert admin API.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod storage;
pub mod transport;

pub use auth::LoginGrant;
pub use error::Error;
pub use middleware::{
    BearerAuth, LogoutOnUnauthorized, MiddlewareChain, RawResponse, RequestHook, ResponseHook,
};
pub use models::{
    Account, AlertHistoryItem, AlertReceiver, AlertReceiverPayload, CreateAccount, DataEnvelope,
    PageParams, PageResult, Record, UpdateAccount,
};
pub use pipeline::RequestPipeline;
pub use session::{Session, SessionStore};
pub use storage::{FileStorage, MemoryStorage, PersistedSession, SessionError, SessionStorage};
pub use transport::TransportConfig;
