// ── Dashboard facade ──
//
// Owns the session, the request pipeline, and one cache per resource
// type. Front-ends build a `DashboardConfig` and hand it in; nothing in
// here reads config files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::info;
use url::Url;

use starpay_api::{
    Error, FileStorage, MemoryStorage, PageParams, RequestPipeline, Session, SessionError,
    SessionStorage, SessionStore, TransportConfig,
};

use crate::cache::ResourceCache;
use crate::resource::{Accounts, AlertHistory, AlertReceivers, Resource};
use crate::view::PageView;

/// Where the session record lives between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionPersistence {
    /// Forgotten when the process exits.
    #[default]
    Memory,
    /// JSON file at the given path.
    File(PathBuf),
}

/// Everything needed to talk to one backend.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// API base URL, e.g. `https://alerts.example.com`.
    pub base_url: Url,
    /// Rows per page for new views.
    pub page_size: u32,
    /// Per-request timeout.
    pub timeout: Duration,
    pub session: SessionPersistence,
}

impl DashboardConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            page_size: PageParams::DEFAULT_LIMIT,
            timeout: starpay_api::transport::DEFAULT_TIMEOUT,
            session: SessionPersistence::Memory,
        }
    }

    fn storage(&self) -> Arc<dyn SessionStorage> {
        match &self.session {
            SessionPersistence::Memory => Arc::new(MemoryStorage::new()),
            SessionPersistence::File(path) => Arc::new(FileStorage::new(path.clone())),
        }
    }
}

/// Entry point for front-ends.
///
/// Cheaply cloneable. Construction does not touch storage; call
/// [`hydrate`](Self::hydrate) once before the first request.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    session: Arc<SessionStore>,
    pipeline: Arc<RequestPipeline>,
    accounts: Arc<ResourceCache<Accounts>>,
    alert_receivers: Arc<ResourceCache<AlertReceivers>>,
    alert_history: Arc<ResourceCache<AlertHistory>>,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Result<Self, Error> {
        let session = Arc::new(SessionStore::new(config.storage()));
        let transport = TransportConfig {
            timeout: config.timeout,
        };
        let pipeline =
            RequestPipeline::new(config.base_url.clone(), Arc::clone(&session), &transport)?;
        Ok(Self::from_parts(config, session, pipeline))
    }

    /// Assemble a dashboard around an existing pipeline and its store.
    pub fn from_parts(
        config: DashboardConfig,
        session: Arc<SessionStore>,
        pipeline: RequestPipeline,
    ) -> Self {
        let pipeline = Arc::new(pipeline);
        Self {
            inner: Arc::new(DashboardInner {
                config,
                session,
                accounts: Arc::new(ResourceCache::new(Arc::clone(&pipeline))),
                alert_receivers: Arc::new(ResourceCache::new(Arc::clone(&pipeline))),
                alert_history: Arc::new(ResourceCache::new(Arc::clone(&pipeline))),
                pipeline,
            }),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn pipeline(&self) -> &Arc<RequestPipeline> {
        &self.inner.pipeline
    }

    pub fn session_store(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Restore the persisted session. Only the first call does anything.
    pub fn hydrate(&self) -> Result<bool, SessionError> {
        self.inner.session.hydrate()
    }

    /// Exchange credentials for a token and start a session.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Arc<Session>, Error> {
        let grant = self.inner.pipeline.login(username, password).await?;
        self.inner
            .session
            .login(grant.token.expose_secret(), grant.role, grant.username);
        let session = self.inner.session.snapshot();
        info!(username = session.username().unwrap_or("?"), "logged in");
        Ok(session)
    }

    /// End the session and forget every cached page.
    pub fn logout(&self) {
        self.inner.session.logout();
        self.invalidate_all();
        info!("logged out");
    }

    pub fn session(&self) -> Arc<Session> {
        self.inner.session.snapshot()
    }

    // ── Resources ────────────────────────────────────────────────────

    pub fn accounts(&self) -> &Arc<ResourceCache<Accounts>> {
        &self.inner.accounts
    }

    pub fn alert_receivers(&self) -> &Arc<ResourceCache<AlertReceivers>> {
        &self.inner.alert_receivers
    }

    pub fn alert_history(&self) -> &Arc<ResourceCache<AlertHistory>> {
        &self.inner.alert_history
    }

    /// A paginated view over `cache`, starting at page 1 with the
    /// configured page size.
    pub fn view<R: Resource>(&self, cache: &Arc<ResourceCache<R>>) -> PageView<R> {
        PageView::new(
            Arc::clone(cache),
            PageParams::first(self.inner.config.page_size),
        )
    }

    pub fn invalidate_all(&self) {
        self.inner.accounts.invalidate();
        self.inner.alert_receivers.invalidate();
        self.inner.alert_history.invalidate();
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("base_url", &self.inner.config.base_url.as_str())
            .field("session", &self.inner.session.snapshot())
            .finish_non_exhaustive()
    }
}
