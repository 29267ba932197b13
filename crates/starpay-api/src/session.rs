// ── Session store ──
//
// The single authoritative holder of "who is logged in". Reads are
// wait-free snapshots; every transition replaces the whole session in one
// swap, so a request never observes a token from one login paired with a
// role from another.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::storage::{PersistedSession, SESSION_SCHEMA_VERSION, SessionError, SessionStorage};

// ── Session ──────────────────────────────────────────────────────────

/// An immutable view of the authentication identity.
///
/// `is_authenticated()` is derived from the token, so the two can never
/// disagree.
#[derive(Clone, Default)]
pub struct Session {
    token: Option<SecretString>,
    role: Option<String>,
    username: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(
        token: impl Into<String>,
        role: Option<String>,
        username: Option<String>,
    ) -> Self {
        Self {
            token: Some(SecretString::from(token.into())),
            role,
            username,
        }
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn to_record(&self) -> PersistedSession {
        PersistedSession {
            token: self.token.as_ref().map(|t| t.expose_secret().to_owned()),
            role: self.role.clone(),
            username: self.username.clone(),
            is_authenticated: self.is_authenticated(),
            version: SESSION_SCHEMA_VERSION,
        }
    }

    fn from_record(record: PersistedSession) -> Self {
        match record.token {
            Some(token) => Self::authenticated(token, record.role, record.username),
            // A record without a token is anonymous whatever else it says.
            None => Self::anonymous(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("role", &self.role)
            .field("username", &self.username)
            .field("is_authenticated", &self.is_authenticated())
            .finish()
    }
}

// ── SessionStore ─────────────────────────────────────────────────────

/// Holds the live [`Session`] and persists it on every transition.
///
/// Two-phase lifecycle: [`new`](Self::new) yields an Anonymous, unhydrated
/// store; [`hydrate`](Self::hydrate) must then be called once at startup to
/// apply whatever was persisted by a previous run. Nothing loads implicitly.
pub struct SessionStore {
    current: ArcSwap<Session>,
    changes: watch::Sender<Arc<Session>>,
    hydrated: AtomicBool,
    storage: Arc<dyn SessionStorage>,
    // Held across swap + save (and across hydrate) so the record on disk
    // always matches the last transition applied in memory.
    transitions: Mutex<()>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let initial = Arc::new(Session::anonymous());
        let (changes, _) = watch::channel(Arc::clone(&initial));
        Self {
            current: ArcSwap::new(initial),
            changes,
            hydrated: AtomicBool::new(false),
            storage,
            transitions: Mutex::new(()),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Apply the persisted session, once.
    ///
    /// Returns `Ok(true)` if an authenticated session was restored. A
    /// record written under a different schema version is discarded. After
    /// the first call, or after any `login`/`logout`, this is a no-op that
    /// returns `Ok(false)`. A read failure leaves the store Anonymous and
    /// still counts as the one hydration.
    pub fn hydrate(&self) -> Result<bool, SessionError> {
        let _guard = self.lock_transitions();
        if self.hydrated.swap(true, Ordering::AcqRel) {
            debug!("session already hydrated, skipping");
            return Ok(false);
        }

        let Some(record) = self.storage.load()? else {
            debug!("no persisted session");
            return Ok(false);
        };

        if record.version != SESSION_SCHEMA_VERSION {
            warn!(
                found = record.version,
                expected = SESSION_SCHEMA_VERSION,
                "discarding persisted session with unknown schema version"
            );
            return Ok(false);
        }

        let session = Session::from_record(record);
        let restored = session.is_authenticated();
        self.replace(session);
        debug!(restored, "session hydrated");
        Ok(restored)
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated.load(Ordering::Acquire)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Become Authenticated. Every field is overwritten, including the
    /// optional ones, so nothing from a previous session survives.
    pub fn login(&self, token: impl Into<String>, role: Option<String>, username: Option<String>) {
        let session = Session::authenticated(token, role, username);
        info!(username = session.username().unwrap_or("-"), "logged in");
        self.transition(session);
    }

    /// Become Anonymous. Safe to call from any state, any number of times.
    pub fn logout(&self) {
        if self.is_authenticated() {
            info!("logged out");
        }
        self.transition(Session::anonymous());
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The whole session as one consistent snapshot.
    pub fn snapshot(&self) -> Arc<Session> {
        self.current.load_full()
    }

    pub fn token(&self) -> Option<SecretString> {
        self.current.load().token().cloned()
    }

    pub fn role(&self) -> Option<String> {
        self.current.load().role().map(str::to_owned)
    }

    pub fn username(&self) -> Option<String> {
        self.current.load().username().map(str::to_owned)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.load().is_authenticated()
    }

    /// Observe transitions (login, logout, forced logout on 401).
    pub fn subscribe(&self) -> watch::Receiver<Arc<Session>> {
        self.changes.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn transition(&self, session: Session) {
        let record = session.to_record();
        let _guard = self.lock_transitions();
        self.hydrated.store(true, Ordering::Release);
        self.replace(session);
        // The in-memory transition stands even if the disk write fails.
        if let Err(e) = self.storage.save(&record) {
            warn!(error = %e, "failed to persist session");
        }
    }

    fn lock_transitions(&self) -> MutexGuard<'_, ()> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, session: Session) {
        let session = Arc::new(session);
        self.current.store(Arc::clone(&session));
        self.changes.send_replace(session);
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("current", &self.snapshot())
            .field("hydrated", &self.is_hydrated())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, SessionStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(Arc::clone(&storage) as Arc<dyn SessionStorage>);
        (storage, store)
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Gate {
        Load,
        Save,
    }

    /// Blocks inside the first `load` or `save` until the test releases it.
    struct GatedStorage {
        inner: MemoryStorage,
        gate: Gate,
        armed: AtomicBool,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl GatedStorage {
        fn new(
            inner: MemoryStorage,
            gate: Gate,
        ) -> (Arc<Self>, mpsc::Receiver<()>, mpsc::Sender<()>) {
            let (entered_tx, entered_rx) = mpsc::channel();
            let (release_tx, release_rx) = mpsc::channel();
            let storage = Arc::new(Self {
                inner,
                gate,
                armed: AtomicBool::new(true),
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            });
            (storage, entered_rx, release_tx)
        }

        fn wait_if_armed(&self, op: Gate) {
            if op == self.gate && self.armed.swap(false, Ordering::AcqRel) {
                self.entered.lock().unwrap().send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
        }
    }

    impl SessionStorage for GatedStorage {
        fn load(&self) -> Result<Option<PersistedSession>, SessionError> {
            let record = self.inner.load();
            self.wait_if_armed(Gate::Load);
            record
        }

        fn save(&self, record: &PersistedSession) -> Result<(), SessionError> {
            self.wait_if_armed(Gate::Save);
            self.inner.save(record)
        }
    }

    fn token_of(store: &SessionStore) -> Option<String> {
        store.token().map(|t| t.expose_secret().to_owned())
    }

    #[test]
    fn starts_anonymous_and_unhydrated() {
        let (_, store) = store();
        assert!(!store.is_authenticated());
        assert!(!store.is_hydrated());
        assert!(store.token().is_none());
    }

    #[test]
    fn login_sets_every_field() {
        let (_, store) = store();
        store.login("tok-a", Some("admin".into()), Some("alice".into()));

        assert_eq!(token_of(&store).as_deref(), Some("tok-a"));
        assert!(store.is_authenticated());
        assert_eq!(store.role().as_deref(), Some("admin"));
        assert_eq!(store.username().as_deref(), Some("alice"));
    }

    #[test]
    fn logout_is_idempotent() {
        let (storage, store) = store();
        store.login("tok", None, None);
        store.logout();
        let after_one = storage.record();
        store.logout();

        assert!(store.token().is_none());
        assert!(!store.is_authenticated());
        assert_eq!(storage.record(), after_one);
    }

    #[test]
    fn second_session_keeps_nothing_from_the_first() {
        let (_, store) = store();
        store.login("tok-a", Some("admin".into()), Some("alice".into()));
        store.logout();
        store.login("tok-b", Some("viewer".into()), Some("bob".into()));

        assert_eq!(token_of(&store).as_deref(), Some("tok-b"));
        assert_eq!(store.role().as_deref(), Some("viewer"));
        assert_eq!(store.username().as_deref(), Some("bob"));
    }

    #[test]
    fn login_without_optional_fields_clears_them() {
        let (_, store) = store();
        store.login("tok-a", Some("admin".into()), Some("alice".into()));
        store.login("tok-b", None, None);

        assert_eq!(store.role(), None);
        assert_eq!(store.username(), None);
    }

    #[test]
    fn every_transition_is_persisted() {
        let (storage, store) = store();
        store.login("tok", Some("admin".into()), Some("alice".into()));
        let rec = storage.record().unwrap();
        assert_eq!(rec.token.as_deref(), Some("tok"));
        assert!(rec.is_authenticated);
        assert_eq!(rec.version, SESSION_SCHEMA_VERSION);

        store.logout();
        let rec = storage.record().unwrap();
        assert_eq!(rec.token, None);
        assert_eq!(rec.role, None);
        assert!(!rec.is_authenticated);
    }

    #[test]
    fn hydrate_restores_persisted_session() {
        let storage = Arc::new(MemoryStorage::with_record(PersistedSession {
            token: Some("saved".into()),
            role: Some("admin".into()),
            username: Some("alice".into()),
            is_authenticated: true,
            version: SESSION_SCHEMA_VERSION,
        }));
        let store = SessionStore::new(storage);

        assert!(!store.is_authenticated());
        assert!(store.hydrate().unwrap());
        assert_eq!(token_of(&store).as_deref(), Some("saved"));
        assert_eq!(store.username().as_deref(), Some("alice"));
    }

    #[test]
    fn hydrate_discards_other_schema_versions() {
        let storage = Arc::new(MemoryStorage::with_record(PersistedSession {
            token: Some("old".into()),
            role: None,
            username: None,
            is_authenticated: true,
            version: 0,
        }));
        let store = SessionStore::new(storage);

        assert!(!store.hydrate().unwrap());
        assert!(!store.is_authenticated());
        assert!(store.is_hydrated());
    }

    #[test]
    fn hydrate_trusts_token_over_flag() {
        let storage = Arc::new(MemoryStorage::with_record(PersistedSession {
            token: None,
            role: Some("admin".into()),
            username: Some("alice".into()),
            is_authenticated: true,
            version: SESSION_SCHEMA_VERSION,
        }));
        let store = SessionStore::new(storage);

        assert!(!store.hydrate().unwrap());
        assert!(!store.is_authenticated());
        assert_eq!(store.role(), None);
    }

    #[test]
    fn hydrate_runs_once() {
        let storage = Arc::new(MemoryStorage::with_record(PersistedSession {
            token: Some("saved".into()),
            role: None,
            username: None,
            is_authenticated: true,
            version: SESSION_SCHEMA_VERSION,
        }));
        let store = SessionStore::new(storage);

        assert!(store.hydrate().unwrap());
        store.logout();
        assert!(!store.hydrate().unwrap());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn hydrate_after_login_does_not_clobber() {
        let storage = Arc::new(MemoryStorage::with_record(PersistedSession {
            token: Some("stale".into()),
            role: None,
            username: None,
            is_authenticated: true,
            version: SESSION_SCHEMA_VERSION,
        }));
        let store = SessionStore::new(storage);
        store.login("fresh", None, None);

        assert!(!store.hydrate().unwrap());
        assert_eq!(token_of(&store).as_deref(), Some("fresh"));
    }

    #[test]
    fn subscribers_see_transitions() {
        let (_, store) = store();
        let rx = store.subscribe();
        store.login("tok", None, Some("alice".into()));
        assert!(rx.borrow().is_authenticated());
        store.logout();
        assert!(!rx.borrow().is_authenticated());
    }

    #[test]
    fn debug_redacts_token() {
        let session = Session::authenticated("super-secret", None, None);
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn disk_order_follows_memory_order() {
        let (storage, entered, release) = GatedStorage::new(MemoryStorage::new(), Gate::Save);
        let store = Arc::new(SessionStore::new(Arc::clone(&storage) as Arc<dyn SessionStorage>));

        let login = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.login("tok-a", None, None))
        };
        entered.recv().unwrap();

        let logout = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.logout())
        };
        thread::sleep(Duration::from_millis(50));
        release.send(()).unwrap();
        login.join().unwrap();
        logout.join().unwrap();

        assert!(!store.is_authenticated());
        let record = storage.inner.record().unwrap();
        assert_eq!(record.token, None);
        assert!(!record.is_authenticated);
    }

    #[test]
    fn login_during_hydrate_is_not_overwritten() {
        let persisted = MemoryStorage::with_record(PersistedSession {
            token: Some("old".into()),
            role: None,
            username: None,
            is_authenticated: true,
            version: SESSION_SCHEMA_VERSION,
        });
        let (storage, entered, release) = GatedStorage::new(persisted, Gate::Load);
        let store = Arc::new(SessionStore::new(storage as Arc<dyn SessionStorage>));

        let hydrate = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.hydrate().unwrap())
        };
        entered.recv().unwrap();

        let login = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.login("fresh", None, None))
        };
        thread::sleep(Duration::from_millis(50));
        release.send(()).unwrap();
        assert!(hydrate.join().unwrap());
        login.join().unwrap();

        assert_eq!(token_of(&store).as_deref(), Some("fresh"));
    }
}
