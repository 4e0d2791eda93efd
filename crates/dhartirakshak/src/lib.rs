//! # DhartiRakshak
//!
//! Typed client for the DhartiRakshak agriculture publishing API: the admin
//! content endpoints (news, trending items, banners, advertisements,
//! e-papers, categories, research moderation, business settings), the public
//! read endpoints, user and admin sessions, and OpenWeatherMap lookups for the
//! weather widget.
//!
//! On top of the plain request methods sit two controllers that carry the
//! admin list pages' behavior:
//!
//! - [`controller::ListController`] holds a fetched collection, replaces it
//!   wholesale on every fetch, and re-fetches after each mutation.
//! - [`controller::ToggleController`] flips one boolean field optimistically
//!   and rolls back to a snapshot taken at invocation if the server refuses.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dhartirakshak::client::DhartiClient;
//! use dhartirakshak::controller::{ListController, ToggleController};
//! use dhartirakshak::notify::TracingNotifier;
//! use dhartirakshak::resource::TRENDING_NEWS;
//! use dhartirakshak::session::{AuthSession, Realm};
//! use dhartirakshak_common::session::MemorySessionStore;
//!
//! #[tokio::main]
//! async fn main() -> miette::Result<()> {
//!     let client = DhartiClient::default_reqwest();
//!     let store = Arc::new(MemorySessionStore::default());
//!     let admin = Arc::new(AuthSession::new(Realm::Admin, store, client.clone()));
//!     admin.login("editor@example.com", "secret").await?;
//!
//!     let list = Arc::new(ListController::new(
//!         client.resource(&TRENDING_NEWS),
//!         admin.clone(),
//!         TracingNotifier,
//!     ));
//!     list.fetch().await?;
//!
//!     let toggles = ToggleController::new(list.clone());
//!     if let Some(id) = list.ids().first() {
//!         toggles.toggle(id).await?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod controller;
pub mod notify;
pub mod resource;
pub mod session;
pub mod weather;

pub use dhartirakshak_common as common;
pub use dhartirakshak_common::{ApiResult, ClientError, ItemId, Record};
