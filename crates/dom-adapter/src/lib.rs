//! Page access port for mrfill.
//!
//! Everything above this crate talks to the host page exclusively through
//! [`DomPort`]: single-shot queries returning transient [`NodeHandle`]s,
//! attribute/text reads, and the two writes the driver needs (click,
//! set-value-with-events). Two backends live here: a Chromium DevTools
//! adapter ([`cdp::CdpSession`]) and a scripted in-memory page
//! ([`fake::FakePage`]) used by tests across the workspace.

pub mod cdp;
pub mod fake;
mod selector;

pub use cdp::{CdpDom, CdpSession};
pub use fake::{Effect, FakePage};

use async_trait::async_trait;
use thiserror::Error;

/// Transient reference to a DOM node. Valid only until the host page
/// re-renders; callers re-resolve every pass instead of persisting these.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NodeHandle(pub u64);

#[derive(Debug, Error, Clone)]
pub enum DomError {
    /// The node behind a handle is no longer attached to the document.
    #[error("stale node handle {0:?}")]
    Stale(NodeHandle),
    #[error("unsupported selector: {0}")]
    Selector(String),
    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait DomPort: Send + Sync {
    /// Current `location.pathname` of the page.
    async fn location_path(&self) -> Result<String, DomError>;

    /// First match for `selector` under `scope` (document when `None`).
    /// A stale scope reads as no match; popups vanish mid-interaction and
    /// the callers treat that as not-found.
    async fn query(
        &self,
        scope: Option<&NodeHandle>,
        selector: &str,
    ) -> Result<Option<NodeHandle>, DomError>;

    /// All matches for `selector` under `scope`, in document order.
    async fn query_all(
        &self,
        scope: Option<&NodeHandle>,
        selector: &str,
    ) -> Result<Vec<NodeHandle>, DomError>;

    /// Attribute value; for form controls `value` reads the live value.
    async fn attribute(&self, node: &NodeHandle, name: &str)
        -> Result<Option<String>, DomError>;

    /// Trimmed visible text content of the node and its descendants.
    async fn text(&self, node: &NodeHandle) -> Result<String, DomError>;

    /// Whether the node or one of its ancestors matches `selector`.
    async fn in_closest(&self, node: &NodeHandle, selector: &str) -> Result<bool, DomError>;

    /// Dispatch a click on the node.
    async fn click(&self, node: &NodeHandle) -> Result<(), DomError>;

    /// Set a control's value and dispatch input/change/keyup so the host
    /// page's own listeners react.
    async fn set_value(&self, node: &NodeHandle, value: &str) -> Result<(), DomError>;
}
