use mrfill_dom_adapter::DomError;
use thiserror::Error;

/// Interaction failures only; "no matching option" is the `NotFound`
/// outcome, not an error.
#[derive(Debug, Error, Clone)]
pub enum SelectError {
    #[error("dom interaction failed: {0}")]
    Dom(#[from] DomError),
}
