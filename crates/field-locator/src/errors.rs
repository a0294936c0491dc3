use mrfill_dom_adapter::DomError;
use thiserror::Error;

/// "No control found" is an `Ok(None)` outcome, not an error; this enum
/// covers genuine access failures only.
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    #[error("dom access failed: {0}")]
    Dom(#[from] DomError),
}
