//! In-memory collection with fetch-replace and mutate-then-refetch.
//!
//! The collection is never patched after a mutation. Every successful
//! mutation is followed by a full fetch, and every successful fetch replaces
//! the collection outright, so items deleted server-side disappear and
//! repeated fetches of unchanged data leave it unchanged.

use std::future::Future;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use smol_str::{SmolStr, format_smolstr};

use dhartirakshak_common::error::AuthError;
use dhartirakshak_common::http_client::HttpClient;
use dhartirakshak_common::normalize::RecordExt;
use dhartirakshak_common::{ApiResult, ClientError, ItemId, Record};

use crate::notify::{Notification, Notifier};
use crate::resource::{IntoForm, Resource};
use crate::session::SessionProvider;

/// Where a list controller gets its items.
#[cfg_attr(not(target_arch = "wasm32"), trait_variant::make(Send))]
pub trait ListSource {
    /// Plural label for messages, e.g. `"trending news"`.
    fn label(&self) -> SmolStr;

    /// Fetch the full collection.
    fn list(&self, token: &str) -> impl Future<Output = ApiResult<Vec<Record>>>;
}

impl<C: HttpClient + Sync> ListSource for Resource<C> {
    fn label(&self) -> SmolStr {
        if self.is_pending() {
            format_smolstr!("pending {}", self.spec().label)
        } else {
            SmolStr::new_static(self.spec().label)
        }
    }

    async fn list(&self, token: &str) -> ApiResult<Vec<Record>> {
        Resource::list(self, token).await
    }
}

#[derive(Debug, Default)]
struct ListState {
    items: Vec<Record>,
    error: Option<String>,
    loading: bool,
}

/// Holds one admin collection and runs mutations against it.
pub struct ListController<L, P, N> {
    source: L,
    session: P,
    notifier: N,
    state: RwLock<ListState>,
}

impl<L, P, N> ListController<L, P, N> {
    /// Empty controller. Nothing is fetched until [`fetch`](Self::fetch).
    pub fn new(source: L, session: P, notifier: N) -> Self {
        Self {
            source,
            session,
            notifier,
            state: RwLock::new(ListState::default()),
        }
    }

    /// The list source.
    pub fn source(&self) -> &L {
        &self.source
    }

    /// The token provider.
    pub fn session(&self) -> &P {
        &self.session
    }

    /// The notification sink.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn read(&self) -> RwLockReadGuard<'_, ListState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ListState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current collection, in server order.
    pub fn items(&self) -> Vec<Record> {
        self.read().items.clone()
    }

    /// Identifiers of the current collection, skipping items without one.
    pub fn ids(&self) -> Vec<ItemId> {
        self.read().items.iter().filter_map(|r| r.item_id()).collect()
    }

    /// The item with this identifier.
    pub fn get(&self, id: &ItemId) -> Option<Record> {
        self.read()
            .items
            .iter()
            .find(|r| r.item_id().as_ref() == Some(id))
            .cloned()
    }

    /// Number of items held.
    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    /// True when no items are held.
    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }

    /// Inline error from the last fetch, if it failed.
    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    /// True while a fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// Run `f` with exclusive access to the collection.
    ///
    /// The lock is released before `f`'s result is returned; never call this
    /// from inside `f`.
    pub fn with_items_mut<R>(&self, f: impl FnOnce(&mut Vec<Record>) -> R) -> R {
        f(&mut self.write().items)
    }
}

impl<L, P, N> ListController<L, P, N>
where
    L: ListSource,
    P: SessionProvider,
    N: Notifier,
{
    async fn require_token(&self) -> ApiResult<SmolStr> {
        self.session
            .token()
            .await
            .ok_or(ClientError::Auth(AuthError::NotAuthenticated))
    }

    /// Replace the collection with a fresh copy from the server.
    ///
    /// On failure the last collection is kept and [`error`](Self::error)
    /// reads `Failed to load <label>`. Returns the number of items loaded.
    #[tracing::instrument(level = "debug", skip(self), fields(source = %self.source.label()))]
    pub async fn fetch(&self) -> ApiResult<usize> {
        {
            let mut state = self.write();
            state.loading = true;
            state.error = None;
        }
        let result = match self.require_token().await {
            Ok(token) => self.source.list(&token).await,
            Err(err) => Err(err),
        };
        let mut state = self.write();
        state.loading = false;
        match result {
            Ok(items) => {
                let count = items.len();
                state.items = items;
                tracing::debug!(count, "collection replaced");
                Ok(count)
            }
            Err(err) => {
                tracing::debug!(error = %err, "fetch failed");
                state.error = Some(format!("Failed to load {}", self.source.label()));
                Err(err)
            }
        }
    }

    /// Run one mutating call.
    ///
    /// Success emits `success_message` and re-fetches. Failure emits the
    /// server's first validation message, else its message, else
    /// `failure_message`, and leaves the collection alone.
    pub async fn mutate<T>(
        &self,
        action: impl Future<Output = ApiResult<T>>,
        success_message: &str,
        failure_message: &str,
    ) -> ApiResult<T> {
        match action.await {
            Ok(out) => {
                self.notifier.notify(Notification::success(success_message));
                // a failed refetch is reported inline through `error()`
                let _ = self.fetch().await;
                Ok(out)
            }
            Err(err) => Err(self.fail(err, failure_message)),
        }
    }

    fn fail(&self, err: ClientError, failure_message: &str) -> ClientError {
        self.notifier
            .notify(Notification::error(err.user_message(failure_message)));
        err
    }

    async fn token_or_notify(&self, failure_message: &str) -> ApiResult<SmolStr> {
        match self.require_token().await {
            Ok(token) => Ok(token),
            Err(err) => Err(self.fail(err, failure_message)),
        }
    }
}

impl<C, P, N> ListController<Resource<C>, P, N>
where
    C: HttpClient + Sync,
    P: SessionProvider,
    N: Notifier,
{
    /// Delete an item.
    pub async fn delete(&self, id: &ItemId) -> ApiResult<Value> {
        let token = self.token_or_notify("Delete failed").await?;
        self.mutate(self.source.delete(&token, id), "Deleted", "Delete failed")
            .await
    }

    /// Make an item visible.
    pub async fn activate(&self, id: &ItemId) -> ApiResult<Value> {
        let token = self.token_or_notify("Activate failed").await?;
        self.mutate(self.source.activate(&token, id), "Activated", "Activate failed")
            .await
    }

    /// Hide an item.
    pub async fn deactivate(&self, id: &ItemId) -> ApiResult<Value> {
        let token = self.token_or_notify("Deactivate failed").await?;
        self.mutate(
            self.source.deactivate(&token, id),
            "Deactivated",
            "Deactivate failed",
        )
        .await
    }

    /// Approve a submission.
    pub async fn approve(&self, id: &ItemId) -> ApiResult<Value> {
        let token = self.token_or_notify("Approve failed").await?;
        self.mutate(self.source.approve(&token, id), "Approved", "Approve failed")
            .await
    }

    /// Reject a submission.
    pub async fn reject(&self, id: &ItemId) -> ApiResult<Value> {
        let token = self.token_or_notify("Reject failed").await?;
        self.mutate(self.source.reject(&token, id), "Rejected", "Reject failed")
            .await
    }

    /// Create from a draft. A draft missing required fields is reported
    /// without any request.
    pub async fn create<D: IntoForm>(&self, draft: D) -> ApiResult<Value> {
        if let Err(err) = draft.validate_create() {
            return Err(self.fail(err, "Create failed"));
        }
        let token = self.token_or_notify("Create failed").await?;
        self.mutate(
            self.source.create(&token, draft.into_form()),
            "Created",
            "Create failed",
        )
        .await
    }

    /// Create from a single name (categories).
    pub async fn create_named(&self, name: &str) -> ApiResult<Value> {
        let token = self.token_or_notify("Create failed").await?;
        self.mutate(
            self.source.create_named(&token, name),
            "Created",
            "Create failed",
        )
        .await
    }

    /// Update from a draft.
    pub async fn update<D: IntoForm>(&self, id: &ItemId, draft: D) -> ApiResult<Value> {
        if let Err(err) = draft.validate_update() {
            return Err(self.fail(err, "Update failed"));
        }
        let token = self.token_or_notify("Update failed").await?;
        self.mutate(
            self.source.update(&token, id, draft.into_form()),
            "Updated",
            "Update failed",
        )
        .await
    }
}
