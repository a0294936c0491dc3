//! One fill pass over the merge-request form.

use std::collections::HashSet;
use std::sync::Arc;

use mrfill_core_types::{AttemptKey, FieldKind, FillConfig, FillError, PassReport, PassTrigger};
use mrfill_dom_adapter::{DomPort, NodeHandle};
use mrfill_field_locator::FieldLocator;
use mrfill_page_catalog::TARGET_ROUTE_FRAGMENT;
use mrfill_select_driver::{SelectDriver, SelectPolicy};
use tracing::{debug, instrument, warn};

use crate::readiness::{wait_for_form, ReadinessPolicy};

/// Walks the form in fixed field order, bounded by the completed-set.
/// Owned by a single task; the completed-set lives for one page lifetime.
pub struct FillEngine {
    dom: Arc<dyn DomPort>,
    locator: FieldLocator,
    driver: SelectDriver,
    readiness: ReadinessPolicy,
    completed: HashSet<AttemptKey>,
}

impl FillEngine {
    pub fn new(
        dom: Arc<dyn DomPort>,
        select_policy: SelectPolicy,
        readiness: ReadinessPolicy,
    ) -> Self {
        Self {
            locator: FieldLocator::new(dom.clone()),
            driver: SelectDriver::new(dom.clone(), select_policy),
            dom,
            readiness,
            completed: HashSet::new(),
        }
    }

    /// Forget completed attempts. Called on navigation to a fresh page.
    pub fn reset_completed(&mut self) {
        self.completed.clear();
    }

    /// Run one best-effort pass. Field-level failures are logged and the
    /// pass moves on; no error surfaces to the caller.
    #[instrument(skip(self, config), fields(trigger = ?trigger))]
    pub async fn run_pass(&mut self, config: &FillConfig, trigger: PassTrigger) -> PassReport {
        let mut report = PassReport::new(trigger);

        if trigger == PassTrigger::Mutation && !self.on_target_route().await {
            debug!("not on the merge-request route, pass skipped");
            return report.finish();
        }

        match wait_for_form(self.dom.as_ref(), &self.readiness).await {
            Ok(()) => report.form_ready = true,
            Err(err) => {
                debug!(%err, "pass ends with nothing filled");
                return report.finish();
            }
        }
        if !config.enabled {
            debug!("filling disabled by config");
            return report.finish();
        }
        if config.is_empty() {
            debug!("nothing configured to fill");
            return report.finish();
        }

        if !config.assignee.is_empty() {
            let key = AttemptKey::assignee(&config.assignee);
            if !self.skip_completed(&mut report, &key) {
                let result = self.fill_assignee(&config.assignee).await;
                self.record(&mut report, key, result);
            }
        }
        if !config.reviewers.is_empty() {
            let key = AttemptKey::reviewers(&config.reviewers);
            if !self.skip_completed(&mut report, &key) {
                let result = self.fill_reviewers(&config.reviewers).await;
                self.record(&mut report, key, result);
            }
        }
        if !config.labels.is_empty() {
            let key = AttemptKey::labels(&config.labels);
            if !self.skip_completed(&mut report, &key) {
                let result = self.fill_labels(&config.labels).await;
                self.record(&mut report, key, result);
            }
        }

        report.finish()
    }

    async fn on_target_route(&self) -> bool {
        match self.dom.location_path().await {
            Ok(path) => path.contains(TARGET_ROUTE_FRAGMENT),
            Err(err) => {
                debug!(%err, "route check failed");
                false
            }
        }
    }

    fn skip_completed(&self, report: &mut PassReport, key: &AttemptKey) -> bool {
        if self.completed.contains(key) {
            debug!(%key, "already completed, skipping");
            report.skipped.push(key.clone());
            return true;
        }
        false
    }

    /// The key enters the completed-set only when at least one value
    /// committed; a fully not-found field stays eligible for the next pass.
    fn record(&mut self, report: &mut PassReport, key: AttemptKey, result: Result<bool, FillError>) {
        match result {
            Ok(true) => {
                self.completed.insert(key.clone());
                report.committed.push(key);
            }
            Ok(false) => debug!(%key, "nothing committed, key stays open"),
            Err(err) => warn!(%key, %err, "field attempt failed"),
        }
    }

    async fn fill_assignee(&self, name: &str) -> Result<bool, FillError> {
        let control = self.require_control(FieldKind::Assignee).await?;
        let outcome = self
            .driver
            .select(&control, name, FieldKind::Assignee)
            .await
            .map_err(interaction)?;
        Ok(outcome.is_committed())
    }

    async fn fill_reviewers(&self, names: &[String]) -> Result<bool, FillError> {
        let control = self.require_control(FieldKind::Reviewer).await?;
        let outcomes = self
            .driver
            .select_reviewers(&control, names)
            .await
            .map_err(interaction)?;
        Ok(outcomes.iter().any(|(_, o)| o.is_committed()))
    }

    async fn fill_labels(&self, names: &[String]) -> Result<bool, FillError> {
        let control = self.require_control(FieldKind::Label).await?;
        let outcomes = self
            .driver
            .select_labels(&control, names)
            .await
            .map_err(interaction)?;
        Ok(outcomes.iter().any(|(_, o)| o.is_committed()))
    }

    async fn require_control(&self, kind: FieldKind) -> Result<NodeHandle, FillError> {
        self.locator
            .locate(kind)
            .await
            .map_err(interaction)?
            .ok_or_else(|| FillError::NotFound(format!("{kind} control")))
    }
}

fn interaction(err: impl std::fmt::Display) -> FillError {
    FillError::Interaction(err.to_string())
}
