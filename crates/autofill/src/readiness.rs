//! Form-readiness detection.
//!
//! The merge-request form mounts asynchronously after navigation; a pass
//! polls for any of the structural signatures before touching anything.
//! Hitting the attempt ceiling is not an error, the pass just ends with
//! nothing filled.

use std::time::Duration;

use mrfill_core_types::FillError;
use mrfill_dom_adapter::DomPort;
use mrfill_page_catalog::FORM_SIGNATURES;
use tokio::time::sleep;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct ReadinessPolicy {
    /// Interval between signature probes.
    pub interval: Duration,
    /// Ceiling on probe attempts (~15 s at the default interval).
    pub attempts: u32,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            attempts: 150,
        }
    }
}

impl ReadinessPolicy {
    /// One zero-delay probe. For tests.
    pub fn immediate() -> Self {
        Self {
            interval: Duration::ZERO,
            attempts: 1,
        }
    }
}

/// Resolves once any form signature matches; hitting the attempt ceiling
/// yields a `Timeout`. DOM read failures count as "not ready yet" and the
/// polling continues.
pub async fn wait_for_form(dom: &dyn DomPort, policy: &ReadinessPolicy) -> Result<(), FillError> {
    for attempt in 0..policy.attempts {
        for &selector in FORM_SIGNATURES {
            match dom.query(None, selector).await {
                Ok(Some(_)) => {
                    debug!(selector, attempt, "form is ready");
                    return Ok(());
                }
                Ok(None) => {}
                Err(err) => debug!(selector, %err, "readiness probe failed"),
            }
        }
        if attempt + 1 < policy.attempts {
            sleep(policy.interval).await;
        }
    }
    Err(FillError::Timeout(format!(
        "form not ready after {} attempts",
        policy.attempts
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mrfill_dom_adapter::FakePage;

    #[tokio::test]
    async fn signature_match_reports_ready() {
        let page = Arc::new(FakePage::new());
        page.element(None, "form", &[("class", "merge-request-form")], "");
        assert!(wait_for_form(page.as_ref(), &ReadinessPolicy::immediate())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn bare_page_times_out_with_a_timeout_error() {
        let page = Arc::new(FakePage::new());
        page.element(None, "div", &[("class", "sidebar")], "");
        let policy = ReadinessPolicy {
            interval: Duration::ZERO,
            attempts: 3,
        };
        let result = wait_for_form(page.as_ref(), &policy).await;
        assert!(matches!(result, Err(FillError::Timeout(_))));
    }
}
