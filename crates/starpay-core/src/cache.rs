// ── Paginated resource cache ──
//
// One cache per resource type, keyed by `(resource, page, limit)`.
// Concurrent lookups for the same key share a single in-flight request.
// Any successful mutation marks every entry stale; a fetch that was
// already running when that happened is detached and its result is
// never stored as fresh. Pages belong to the session that fetched them:
// any login or logout (including one forced by a 401) empties the cache.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use starpay_api::{
    DataEnvelope, Error, PageParams, PageResult, RawResponse, RequestPipeline, Session,
};

use crate::resource::{MutableResource, Resource, ResourceKind};

type SharedFetch<T> = Shared<BoxFuture<'static, Result<Arc<PageResult<T>>, Error>>>;

/// Structural identity of one cached page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub resource: ResourceKind,
    pub params: PageParams,
}

impl CacheKey {
    pub fn new(resource: ResourceKind, params: PageParams) -> Self {
        Self { resource, params }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[page={} limit={}]",
            self.resource,
            self.params.page(),
            self.params.limit()
        )
    }
}

struct InFlight<T> {
    id: u64,
    fetch: SharedFetch<T>,
}

struct CacheEntry<T> {
    value: Option<Arc<PageResult<T>>>,
    stale: bool,
    in_flight: Option<InFlight<T>>,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            value: None,
            stale: false,
            in_flight: None,
        }
    }
}

impl<T> CacheEntry<T> {
    fn fresh(&self) -> Option<&Arc<PageResult<T>>> {
        self.value.as_ref().filter(|_| !self.stale)
    }
}

/// Read-through cache for one paginated resource.
///
/// Entries never expire on their own; they only go stale through
/// [`invalidate`](Self::invalidate) or a successful mutation.
pub struct ResourceCache<R: Resource> {
    pipeline: Arc<RequestPipeline>,
    entries: DashMap<CacheKey, CacheEntry<R::Item>>,
    next_request: AtomicU64,
    session: Mutex<watch::Receiver<Arc<Session>>>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> ResourceCache<R> {
    pub fn new(pipeline: Arc<RequestPipeline>) -> Self {
        let session = pipeline.session().subscribe();
        Self {
            pipeline,
            entries: DashMap::new(),
            next_request: AtomicU64::new(1),
            session: Mutex::new(session),
            _resource: PhantomData,
        }
    }

    /// Drop every entry if the session changed since the last lookup.
    ///
    /// Clearing (rather than marking stale) also detaches in-flight
    /// fetches, so a page requested under the old token is never stored.
    fn follow_session(&self) {
        let changed = {
            let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
            let changed = session.has_changed().unwrap_or(false);
            if changed {
                session.mark_unchanged();
            }
            changed
        };
        if changed {
            let dropped = self.entries.len();
            self.entries.clear();
            debug!(resource = %R::KIND, entries = dropped, "session changed, cache cleared");
        }
    }

    /// Fetch one page.
    ///
    /// A fresh cached page is returned without touching the network. A
    /// request already running for the same key is joined rather than
    /// duplicated.
    pub async fn list(&self, params: PageParams) -> Result<Arc<PageResult<R::Item>>, Error> {
        self.follow_session();
        let key = CacheKey::new(R::KIND, params);

        let (id, fetch) = {
            let mut entry = self.entries.entry(key).or_default();
            if let Some(value) = entry.fresh() {
                trace!(%key, "cache hit");
                return Ok(Arc::clone(value));
            }
            let joined = entry
                .in_flight
                .as_ref()
                .map(|flight| (flight.id, flight.fetch.clone()));
            if let Some((id, fetch)) = joined {
                trace!(%key, request = id, "joining in-flight request");
                (id, fetch)
            } else {
                let id = self.next_request.fetch_add(1, Ordering::Relaxed);
                debug!(%key, request = id, "cache miss, fetching");
                let fetch = self.start_fetch(params);
                entry.in_flight = Some(InFlight {
                    id,
                    fetch: fetch.clone(),
                });
                (id, fetch)
            }
        };

        let result = fetch.await;
        self.settle(key, id, &result);
        result
    }

    fn start_fetch(&self, params: PageParams) -> SharedFetch<R::Item> {
        let pipeline = Arc::clone(&self.pipeline);
        async move {
            pipeline
                .get_json::<PageResult<R::Item>, _>(R::KIND.path(), &params)
                .await
                .map(Arc::new)
        }
        .boxed()
        .shared()
    }

    /// Record the outcome of request `id`, unless the entry has moved on
    /// (invalidated, or already settled by another waiter).
    fn settle(&self, key: CacheKey, id: u64, result: &Result<Arc<PageResult<R::Item>>, Error>) {
        let Some(mut entry) = self.entries.get_mut(&key) else {
            return;
        };
        if entry.in_flight.as_ref().map(|f| f.id) != Some(id) {
            trace!(%key, request = id, "dropping detached result");
            return;
        }
        entry.in_flight = None;
        if let Ok(page) = result {
            entry.value = Some(Arc::clone(page));
            entry.stale = false;
        }
    }

    /// Mark every page of this resource stale and detach running fetches.
    pub fn invalidate(&self) {
        let mut count = 0usize;
        for mut entry in self.entries.iter_mut() {
            entry.stale = true;
            entry.in_flight = None;
            count += 1;
        }
        debug!(resource = %R::KIND, entries = count, "cache invalidated");
    }

    /// The last page stored for `params`, fresh or stale. No I/O.
    pub fn peek(&self, params: PageParams) -> Option<Arc<PageResult<R::Item>>> {
        self.follow_session();
        self.entries
            .get(&CacheKey::new(R::KIND, params))
            .and_then(|entry| entry.value.clone())
    }

    /// `true` if the next [`list`](Self::list) for `params` would go to the
    /// network (nothing cached yet, or the cached page is stale).
    pub fn is_stale(&self, params: PageParams) -> bool {
        self.follow_session();
        self.entries
            .get(&CacheKey::new(R::KIND, params))
            .is_none_or(|entry| entry.fresh().is_none())
    }

    /// Number of keys the cache knows about.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Mutations ────────────────────────────────────────────────────────

impl<R: MutableResource> ResourceCache<R> {
    /// `POST` a new record. Returns the created record when the server
    /// echoes it back.
    pub async fn create(&self, payload: &R::Create) -> Result<Option<R::Item>, Error> {
        let response = self.pipeline.post(R::KIND.path(), payload).await?;
        self.invalidate();
        Ok(Self::unwrap_record(&response))
    }

    /// `PUT` changes to the record with `id`.
    pub async fn update(&self, id: &str, payload: &R::Update) -> Result<Option<R::Item>, Error> {
        let response = self.pipeline.put(&R::item_path(id), payload).await?;
        self.invalidate();
        Ok(Self::unwrap_record(&response))
    }

    /// `DELETE` the record with `id`.
    pub async fn delete(&self, id: &str) -> Result<(), Error> {
        self.pipeline.delete(&R::item_path(id)).await?;
        self.invalidate();
        Ok(())
    }

    // The write already happened; an odd reply body must not look like a failure.
    fn unwrap_record(response: &RawResponse) -> Option<R::Item> {
        match response.json_optional::<DataEnvelope<R::Item>>() {
            Ok(envelope) => envelope.map(|e| e.data),
            Err(e) => {
                warn!(resource = %R::KIND, error = %e, "mutation succeeded but reply body was not a record");
                None
            }
        }
    }
}

impl<R: Resource> fmt::Debug for ResourceCache<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("resource", &R::KIND)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn keys_are_structural() {
        let a = CacheKey::new(ResourceKind::Accounts, PageParams::new(2, 10).unwrap());
        let b = CacheKey::new(ResourceKind::Accounts, PageParams::new(2, 10).unwrap());
        let c = CacheKey::new(ResourceKind::AlertReceivers, PageParams::new(2, 10).unwrap());
        let d = CacheKey::new(ResourceKind::Accounts, PageParams::new(2, 20).unwrap());

        let set: HashSet<_> = [a, b, c, d].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn key_display() {
        let key = CacheKey::new(ResourceKind::AlertHistory, PageParams::new(3, 25).unwrap());
        assert_eq!(key.to_string(), "alert-history[page=3 limit=25]");
    }

    #[test]
    fn stale_entry_is_not_fresh() {
        let mut entry = CacheEntry::<u32> {
            value: Some(Arc::new(PageResult {
                data: vec![1],
                page: 1,
                limit: 10,
                total: 1,
                status: None,
                message: None,
            })),
            ..CacheEntry::default()
        };
        assert!(entry.fresh().is_some());
        entry.stale = true;
        assert!(entry.fresh().is_none());
    }
}
