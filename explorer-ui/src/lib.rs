//! explorer-ui library - checkpoint explorer front-end
//!
//! Paginated checkpoint list and checkpoint detail views over the explorer
//! JSON API. The page shown lives in the `p` query parameter of an in-memory
//! address bar, so deep links and back/forward reproduce the same view.
//!
//! [`session::ExplorerSession`] is the entry point; the other modules are
//! its parts and can be used on their own.

pub mod alert;
pub mod controller;
pub mod fetcher;
pub mod location;
pub mod pagination;
pub mod refresher;
pub mod render;
pub mod search;
pub mod session;
pub mod view;

pub use controller::{ControllerState, PaginationController};
pub use session::{ExplorerSession, SessionOptions};
pub use view::{ExplorerSources, ExplorerView};
