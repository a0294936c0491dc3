//! Selection driver - performs the open → search → match → commit sequence
//! against the host page's animated popups.
//!
//! Two deliberate policies shape this crate. Committed selections leave the
//! popup open so the operator can keep adding values by hand. And when no
//! option matches the target, nothing is clicked at all: the search box is
//! cleared for a manual retry and the outcome reads not-found. Waiting is
//! done by polling an observed condition within a budget instead of a
//! single fixed sleep; the two inter-item gaps the host page needs to
//! process committed changes stay time-based.

pub mod errors;
pub mod policy;
pub mod wait;

mod driver;

pub use driver::{InteractionMode, SelectDriver};
pub use errors::SelectError;
pub use policy::SelectPolicy;
