//! Optimistic boolean toggles with rollback.
//!
//! A toggle runs in two halves:
//!
//! 1. [`ToggleController::begin`] flips the field in the held collection
//!    immediately and returns a [`ToggleTicket`] recording the value it
//!    replaced. No await happens before the flip.
//! 2. [`ToggleController::settle`] takes the server's answer. Success emits
//!    a notification and, unless disabled, re-fetches. Failure puts that one
//!    item back and emits the failure notification.
//!
//! [`ToggleController::toggle`] runs both halves around the mark/unmark
//! call. Each ticket carries its own snapshot, so overlapping toggles on
//! different items never undo each other.
//!
//! Overlapping toggles of the same item share one record holding the last
//! value the server confirmed and the unsettled tickets. While any ticket is
//! open the item shows the newest open ticket's value; once the last one
//! settles it shows the confirmed value. A lone ticket therefore rolls back
//! to its own `previous`.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use miette::Diagnostic;
use serde_json::Value;
use smol_str::SmolStr;

use dhartirakshak_common::error::AuthError;
use dhartirakshak_common::http_client::HttpClient;
use dhartirakshak_common::normalize::RecordExt;
use dhartirakshak_common::{ApiResult, ClientError, ItemId, Record};

use crate::controller::list::{ListController, ListSource};
use crate::notify::{Notification, Notifier};
use crate::resource::{FlagSpec, Resource};
use crate::session::SessionProvider;

/// Set `field` on the item with `id`, returning the collection.
///
/// Other items are returned untouched; an unknown id returns the collection
/// unchanged.
pub fn set_flag(mut items: Vec<Record>, id: &ItemId, field: &str, value: bool) -> Vec<Record> {
    set_flag_in(&mut items, id, field, value);
    items
}

/// In-place [`set_flag`]. Returns the value the field held before, or `None`
/// when no item has this id.
pub fn set_flag_in(items: &mut [Record], id: &ItemId, field: &str, value: bool) -> Option<bool> {
    let item = items
        .iter_mut()
        .find(|r| r.item_id().as_ref() == Some(id))?;
    let previous = item.flag(field);
    item.set_flag(field, value);
    Some(previous)
}

/// Record of one provisional flip, captured when the toggle starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleTicket {
    /// Item flipped
    pub id: ItemId,
    /// Field flipped
    pub field: &'static str,
    /// Value before the flip, restored on failure
    pub previous: bool,
    /// Provisional value sent to the server
    pub next: bool,
    /// Issue order among this controller's tickets
    pub seq: u64,
}

impl ToggleTicket {
    /// Undo this flip on `items`, leaving every other item alone.
    pub fn rollback(&self, items: &mut [Record]) {
        set_flag_in(items, &self.id, self.field, self.previous);
    }
}

/// Why a toggle did not go through.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ToggleError {
    /// The id is not in the held collection
    #[error("no item {0} in the current list")]
    #[diagnostic(code(dhartirakshak::toggle::unknown_item), help("fetch the list first"))]
    UnknownItem(ItemId),

    /// An earlier toggle of the same item has not settled
    #[error("item {0} is already being updated")]
    #[diagnostic(code(dhartirakshak::toggle::pending))]
    Pending(ItemId),

    /// The collection has no toggle flag
    #[error("{0} has no toggle flag")]
    #[diagnostic(code(dhartirakshak::toggle::no_flag))]
    NoFlag(SmolStr),

    /// The request failed, or never started; the flip was rolled back
    #[error(transparent)]
    #[diagnostic(transparent)]
    Client(#[from] ClientError),
}

/// A list source whose items carry a server-toggled flag.
#[cfg_attr(not(target_arch = "wasm32"), trait_variant::make(Send))]
pub trait FlagEndpoint {
    /// The flag, if this source has one.
    fn flag_spec(&self) -> Option<FlagSpec>;

    /// Ask the server to set the flag to `value`.
    fn send_flag(
        &self,
        token: &str,
        id: &ItemId,
        value: bool,
    ) -> impl Future<Output = ApiResult<Value>>;
}

impl<C: HttpClient + Sync> FlagEndpoint for Resource<C> {
    fn flag_spec(&self) -> Option<FlagSpec> {
        self.spec().flag
    }

    async fn send_flag(&self, token: &str, id: &ItemId, value: bool) -> ApiResult<Value> {
        self.set_flag(token, id, value).await
    }
}

#[derive(Debug, Default)]
struct InFlight {
    last_seq: u64,
    items: HashMap<ItemId, PendingFlag>,
}

#[derive(Debug)]
struct PendingFlag {
    confirmed: bool,
    confirmed_seq: u64,
    // seq -> provisional value
    open: BTreeMap<u64, bool>,
}

impl PendingFlag {
    fn shown(&self) -> bool {
        self.open
            .last_key_value()
            .map_or(self.confirmed, |(_, next)| *next)
    }
}

/// Optimistic toggle over a shared [`ListController`].
pub struct ToggleController<L, P, N> {
    list: Arc<ListController<L, P, N>>,
    refetch_on_success: bool,
    reject_while_pending: bool,
    in_flight: Mutex<InFlight>,
}

impl<L, P, N> ToggleController<L, P, N>
where
    L: ListSource + FlagEndpoint,
    P: SessionProvider,
    N: Notifier,
{
    /// Toggle controller that re-fetches after each success and lets
    /// overlapping toggles of one item through.
    pub fn new(list: Arc<ListController<L, P, N>>) -> Self {
        Self {
            list,
            refetch_on_success: true,
            reject_while_pending: false,
            in_flight: Mutex::new(InFlight::default()),
        }
    }

    /// Whether to re-fetch the list after a confirmed toggle.
    pub fn refetch_on_success(mut self, enabled: bool) -> Self {
        self.refetch_on_success = enabled;
        self
    }

    /// Whether to refuse a toggle while one for the same item is unsettled.
    pub fn reject_while_pending(mut self, enabled: bool) -> Self {
        self.reject_while_pending = enabled;
        self
    }

    /// The shared list.
    pub fn list(&self) -> &Arc<ListController<L, P, N>> {
        &self.list
    }

    /// True while a toggle of `id` is unsettled.
    pub fn is_pending(&self, id: &ItemId) -> bool {
        self.pending_count(id) > 0
    }

    /// Number of unsettled toggles of `id`.
    pub fn pending_count(&self, id: &ItemId) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .get(id)
            .map_or(0, |p| p.open.len())
    }

    fn flag(&self) -> Result<FlagSpec, ToggleError> {
        self.list
            .source()
            .flag_spec()
            .ok_or_else(|| ToggleError::NoFlag(self.list.source().label()))
    }

    /// Flip the item's flag locally and return the ticket to settle.
    pub fn begin(&self, id: &ItemId) -> Result<ToggleTicket, ToggleError> {
        let flag = self.flag()?;
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if self.reject_while_pending && in_flight.items.contains_key(id) {
            return Err(ToggleError::Pending(id.clone()));
        }
        let seq = in_flight.last_seq + 1;
        let ticket = self.list.with_items_mut(|items| {
            let item = items.iter_mut().find(|r| r.item_id().as_ref() == Some(id))?;
            let previous = item.flag(flag.field);
            item.set_flag(flag.field, !previous);
            Some(ToggleTicket {
                id: id.clone(),
                field: flag.field,
                previous,
                next: !previous,
                seq,
            })
        });
        let ticket = ticket.ok_or_else(|| ToggleError::UnknownItem(id.clone()))?;
        in_flight.last_seq = seq;
        in_flight
            .items
            .entry(id.clone())
            .or_insert_with(|| PendingFlag {
                confirmed: ticket.previous,
                confirmed_seq: 0,
                open: BTreeMap::new(),
            })
            .open
            .insert(seq, ticket.next);
        tracing::debug!(id = %ticket.id, next = ticket.next, seq, "provisional flip");
        Ok(ticket)
    }

    /// Apply the server's answer to a ticket from [`begin`](Self::begin).
    ///
    /// Returns the confirmed value.
    pub async fn settle(
        &self,
        ticket: ToggleTicket,
        outcome: ApiResult<Value>,
    ) -> Result<bool, ToggleError> {
        let flag = self.flag()?;
        let shown = self
            .release(&ticket, outcome.is_ok())
            .unwrap_or(if outcome.is_ok() { ticket.next } else { ticket.previous });
        self.list
            .with_items_mut(|items| set_flag_in(items, &ticket.id, ticket.field, shown));
        match outcome {
            Ok(_) => {
                self.list
                    .notifier()
                    .notify(Notification::success(flag.success_message(ticket.next)));
                if self.refetch_on_success {
                    // failures surface through the list's inline error
                    let _ = self.list.fetch().await;
                }
                Ok(ticket.next)
            }
            Err(err) => {
                tracing::debug!(id = %ticket.id, error = %err, shown, "toggle rejected, rolling back");
                self.list
                    .notifier()
                    .notify(Notification::error(flag.failure_message));
                Err(err.into())
            }
        }
    }

    /// Flip `id`, tell the server, and settle.
    ///
    /// Without a token nothing is flipped and no request is made.
    #[tracing::instrument(level = "debug", skip_all, fields(id = %id))]
    pub async fn toggle(&self, id: &ItemId) -> Result<bool, ToggleError> {
        let flag = self.flag()?;
        let Some(token) = self.list.session().token().await else {
            self.list
                .notifier()
                .notify(Notification::error(flag.failure_message));
            return Err(ClientError::Auth(AuthError::NotAuthenticated).into());
        };
        let ticket = self.begin(id)?;
        let mut guard = Abandon {
            owner: self,
            ticket: &ticket,
            armed: true,
        };
        let outcome = self
            .list
            .source()
            .send_flag(&token, &ticket.id, ticket.next)
            .await;
        guard.armed = false;
        drop(guard);
        self.settle(ticket, outcome).await
    }

    /// Close `ticket` and return the value the item should now show, or
    /// `None` if the ticket is not open here.
    fn release(&self, ticket: &ToggleTicket, confirmed: bool) -> Option<bool> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let pending = in_flight.items.get_mut(&ticket.id)?;
        pending.open.remove(&ticket.seq)?;
        if confirmed && ticket.seq > pending.confirmed_seq {
            pending.confirmed = ticket.next;
            pending.confirmed_seq = ticket.seq;
        }
        let shown = pending.shown();
        if pending.open.is_empty() {
            in_flight.items.remove(&ticket.id);
        }
        Some(shown)
    }
}

// Closes the ticket if a toggle future is dropped mid-request. The item keeps
// whatever it shows.
struct Abandon<'a, L, P, N>
where
    L: ListSource + FlagEndpoint,
    P: SessionProvider,
    N: Notifier,
{
    owner: &'a ToggleController<L, P, N>,
    ticket: &'a ToggleTicket,
    armed: bool,
}

impl<L, P, N> Drop for Abandon<'_, L, P, N>
where
    L: ListSource + FlagEndpoint,
    P: SessionProvider,
    N: Notifier,
{
    fn drop(&mut self) {
        if self.armed {
            self.owner.release(self.ticket, false);
        }
    }
}
