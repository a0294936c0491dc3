//! Field locator - resolves a semantic field kind to a form control.
//!
//! Assignee and reviewer controls share generic class names on the host
//! page, so a raw selector hit is never trusted on its own: every candidate
//! must also pass the field kind's confirmation vocabulary (explicit
//! test-id, enclosing kind container, or kind keyword in visible
//! text/placeholder). A generic-looking match without that confirmation is
//! rejected and the table iteration continues.

pub mod errors;
mod locator;

pub use errors::LocatorError;
pub use locator::FieldLocator;
