//! Stateful controllers behind the admin list pages.
//!
//! [`ListController`] owns one fetched collection. [`ToggleController`]
//! borrows it to flip a boolean field optimistically.

pub mod list;
pub mod toggle;

pub use list::{ListController, ListSource};
pub use toggle::{FlagEndpoint, ToggleController, ToggleError, ToggleTicket, set_flag};
