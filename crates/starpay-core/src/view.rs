// ── Rendered page state ──
//
// Tracks which page the user is looking at and what is currently on
// screen. Responses for pages that are no longer active still land in the
// cache but never reach the rendered state.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use starpay_api::{Error, PageParams, PageResult};

use crate::cache::ResourceCache;
use crate::pagination;
use crate::resource::Resource;

/// Snapshot of what a paginated table should render.
#[derive(Debug, Clone)]
pub struct ViewState<T> {
    /// The page the user asked for most recently.
    pub active: PageParams,
    /// Last page that was applied. Kept while the next page loads.
    pub data: Option<Arc<PageResult<T>>>,
    pub loading: bool,
    pub error: Option<Error>,
}

impl<T> ViewState<T> {
    fn new(active: PageParams) -> Self {
        Self {
            active,
            data: None,
            loading: false,
            error: None,
        }
    }

    /// Total pages according to the last applied result, at the active
    /// page size.
    pub fn total_pages(&self) -> Option<u32> {
        self.data
            .as_ref()
            .map(|page| pagination::total_pages(page.total, self.active.limit()))
    }
}

/// A paginated table bound to one resource cache.
pub struct PageView<R: Resource> {
    cache: Arc<ResourceCache<R>>,
    state: watch::Sender<ViewState<R::Item>>,
}

impl<R: Resource> PageView<R> {
    pub fn new(cache: Arc<ResourceCache<R>>, initial: PageParams) -> Self {
        let (state, _) = watch::channel(ViewState::new(initial));
        Self { cache, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<R::Item>> {
        self.state.subscribe()
    }

    /// Clone of the current state.
    pub fn state(&self) -> ViewState<R::Item> {
        self.state.borrow().clone()
    }

    pub fn active(&self) -> PageParams {
        self.state.borrow().active
    }

    /// Make `params` the active page and load it.
    ///
    /// The result is applied to the rendered state only if `params` is
    /// still active when it arrives. Either way the caller gets the
    /// outcome of its own request.
    pub async fn show(&self, params: PageParams) -> Result<Arc<PageResult<R::Item>>, Error> {
        self.state.send_modify(|state| {
            state.active = params;
            state.loading = true;
            state.error = None;
        });

        let result = self.cache.list(params).await;

        let applied = self.state.send_if_modified(|state| {
            if state.active != params {
                return false;
            }
            state.loading = false;
            match &result {
                Ok(page) => {
                    state.data = Some(Arc::clone(page));
                    state.error = None;
                }
                Err(e) => state.error = Some(e.clone()),
            }
            true
        });
        if !applied {
            debug!(
                resource = %R::KIND,
                page = params.page(),
                "ignoring response for a page that is no longer active"
            );
        }

        result
    }

    /// Drop the cached pages and reload the active one.
    pub async fn refresh(&self) -> Result<Arc<PageResult<R::Item>>, Error> {
        self.cache.invalidate();
        self.show(self.active()).await
    }

    /// The last valid page, if the reported total no longer reaches the
    /// active page (e.g. after deleting the only row on the last page).
    pub fn clamp_page(&self) -> Option<PageParams> {
        let state = self.state.borrow();
        let last = state.total_pages()?;
        (state.active.page() > last).then(|| state.active.with_page(last))
    }
}

impl<R: Resource> std::fmt::Debug for PageView<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageView")
            .field("resource", &R::KIND)
            .field("active", &self.active())
            .finish_non_exhaustive()
    }
}
