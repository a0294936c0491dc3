//! Command surface around the engine.
//!
//! One worker task owns the engine, its config snapshot, and the
//! completed-set; commands interleave on an mpsc channel with
//! run-to-completion between awaits. Pass requests go through the
//! `PassGuard` first, so anything raised while a pass is running is
//! dropped at the sender instead of piling up behind it.

use std::sync::{Arc, Mutex};

use mrfill_core_types::{FillConfig, PassReport, PassTrigger};
use mrfill_dom_adapter::DomPort;
use mrfill_select_driver::SelectPolicy;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::engine::FillEngine;
use crate::guard::PassGuard;
use crate::readiness::ReadinessPolicy;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller stopped")]
    Stopped,
}

pub enum Command {
    /// DOM mutation or page load on the target route.
    Mutation,
    /// Forced pass that bypasses the route gate.
    TestFill,
    /// The watched tab moved to a different page: forget completed
    /// attempts, then try a pass on the new page.
    Navigated,
    /// Re-read the config store; keeps the completed-set.
    ReloadConfig,
    GetConfig(oneshot::Sender<FillConfig>),
    LastReport(oneshot::Sender<Option<PassReport>>),
    Shutdown,
}

pub struct Controller {
    tx: mpsc::Sender<Command>,
    guard: Arc<PassGuard>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Controller {
    pub fn start(
        dom: Arc<dyn DomPort>,
        store: Arc<dyn ConfigStore>,
        select_policy: SelectPolicy,
        readiness: ReadinessPolicy,
    ) -> Self {
        let (tx, rx) = mpsc::channel(16);
        let guard = PassGuard::new();
        let engine = FillEngine::new(dom, select_policy, readiness);
        let worker = tokio::spawn(worker_loop(rx, engine, store, guard.clone()));
        Self {
            tx,
            guard,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Raise a pass for a page mutation. Dropped outright while a pass is
    /// running.
    pub async fn signal_mutation(&self) {
        if !self.guard.is_idle() {
            debug!("pass running, mutation signal dropped");
            return;
        }
        if self.tx.send(Command::Mutation).await.is_err() {
            warn!("controller worker gone, mutation signal lost");
        }
    }

    /// Raise a forced pass. Dropped outright while a pass is running.
    pub async fn test_fill(&self) {
        if !self.guard.is_idle() {
            debug!("pass running, test fill dropped");
            return;
        }
        if self.tx.send(Command::TestFill).await.is_err() {
            warn!("controller worker gone, test fill lost");
        }
    }

    /// Report a navigation. Never dropped; the reset must not be lost
    /// even when a pass is mid-flight.
    pub async fn signal_navigation(&self) {
        if self.tx.send(Command::Navigated).await.is_err() {
            warn!("controller worker gone, navigation signal lost");
        }
    }

    pub async fn reload_config(&self) -> Result<(), ControllerError> {
        self.tx
            .send(Command::ReloadConfig)
            .await
            .map_err(|_| ControllerError::Stopped)
    }

    pub async fn config(&self) -> Result<FillConfig, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::GetConfig(reply))
            .await
            .map_err(|_| ControllerError::Stopped)?;
        rx.await.map_err(|_| ControllerError::Stopped)
    }

    pub async fn last_report(&self) -> Result<Option<PassReport>, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::LastReport(reply))
            .await
            .map_err(|_| ControllerError::Stopped)?;
        rx.await.map_err(|_| ControllerError::Stopped)
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(%err, "controller worker ended abnormally");
            }
        }
    }
}

async fn worker_loop(
    mut rx: mpsc::Receiver<Command>,
    mut engine: FillEngine,
    store: Arc<dyn ConfigStore>,
    guard: Arc<PassGuard>,
) {
    let mut config = load_or_default(store.as_ref());
    let mut last_report: Option<PassReport> = None;

    while let Some(command) = rx.recv().await {
        match command {
            Command::Mutation => {
                if let Some(permit) = guard.try_begin() {
                    let report = engine.run_pass(&config, PassTrigger::Mutation).await;
                    last_report = Some(report);
                    drop(permit);
                } else {
                    debug!("pass already running, mutation dropped");
                }
            }
            Command::TestFill => {
                if let Some(permit) = guard.try_begin() {
                    let report = engine.run_pass(&config, PassTrigger::Forced).await;
                    last_report = Some(report);
                    drop(permit);
                } else {
                    debug!("pass already running, test fill dropped");
                }
            }
            Command::Navigated => {
                engine.reset_completed();
                if let Some(permit) = guard.try_begin() {
                    let report = engine.run_pass(&config, PassTrigger::Mutation).await;
                    last_report = Some(report);
                    drop(permit);
                }
            }
            Command::ReloadConfig => {
                config = load_or_default(store.as_ref());
                info!("config reloaded");
            }
            Command::GetConfig(reply) => {
                let _ = reply.send(config.clone());
            }
            Command::LastReport(reply) => {
                let _ = reply.send(last_report.clone());
            }
            Command::Shutdown => break,
        }
    }
    debug!("controller worker stopped");
}

fn load_or_default(store: &dyn ConfigStore) -> FillConfig {
    match store.load() {
        Ok(config) => config,
        Err(err) => {
            warn!(%err, "config load failed, using defaults");
            FillConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use mrfill_core_types::AttemptKey;
    use mrfill_dom_adapter::{DomError, Effect, FakePage, NodeHandle};
    use tokio::sync::Notify;

    use crate::config::MemoryStore;

    /// Delegates to a [`FakePage`], but the first `query` parks until the
    /// test lets it go, holding the pass mid-flight.
    struct HeldPage {
        inner: Arc<FakePage>,
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    impl HeldPage {
        fn new(inner: Arc<FakePage>) -> Arc<Self> {
            Arc::new(Self {
                inner,
                armed: AtomicBool::new(true),
                entered: Notify::new(),
                release: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl DomPort for HeldPage {
        async fn location_path(&self) -> Result<String, DomError> {
            self.inner.location_path().await
        }

        async fn query(
            &self,
            scope: Option<&NodeHandle>,
            selector: &str,
        ) -> Result<Option<NodeHandle>, DomError> {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.query(scope, selector).await
        }

        async fn query_all(
            &self,
            scope: Option<&NodeHandle>,
            selector: &str,
        ) -> Result<Vec<NodeHandle>, DomError> {
            self.inner.query_all(scope, selector).await
        }

        async fn attribute(
            &self,
            node: &NodeHandle,
            name: &str,
        ) -> Result<Option<String>, DomError> {
            self.inner.attribute(node, name).await
        }

        async fn text(&self, node: &NodeHandle) -> Result<String, DomError> {
            self.inner.text(node).await
        }

        async fn in_closest(&self, node: &NodeHandle, selector: &str) -> Result<bool, DomError> {
            self.inner.in_closest(node, selector).await
        }

        async fn click(&self, node: &NodeHandle) -> Result<(), DomError> {
            self.inner.click(node).await
        }

        async fn set_value(&self, node: &NodeHandle, value: &str) -> Result<(), DomError> {
            self.inner.set_value(node, value).await
        }
    }

    fn start(page: &Arc<FakePage>, config: FillConfig) -> Controller {
        Controller::start(
            page.clone() as Arc<dyn DomPort>,
            Arc::new(MemoryStore::new(config)),
            SelectPolicy::immediate(),
            ReadinessPolicy::immediate(),
        )
    }

    fn label_form(page: &Arc<FakePage>) {
        page.set_path("/group/project/-/merge_requests/new");
        page.element(None, "form", &[("class", "merge-request-form")], "");
        let control = page.element(
            None,
            "button",
            &[("data-testid", "issuable-label-dropdown")],
            "Labels",
        );
        let popup = page.element(
            None,
            "div",
            &[("data-testid", "labels-select-dropdown-contents")],
            "",
        );
        page.element(Some(popup), "li", &[("data-testid", "labels-list")], "bug");
        page.on_click(control, Effect::AddClass(popup, "show"));
    }

    #[tokio::test]
    async fn get_config_replies_with_the_store_snapshot() {
        let page = Arc::new(FakePage::new());
        let config = FillConfig {
            enabled: true,
            assignee: "alice".into(),
            reviewers: Vec::new(),
            labels: Vec::new(),
        };
        let controller = start(&page, config.clone());

        assert_eq!(controller.config().await.unwrap(), config);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_fill_runs_a_pass_and_reports_it() {
        let page = Arc::new(FakePage::new());
        label_form(&page);
        let config = FillConfig {
            enabled: true,
            assignee: String::new(),
            reviewers: Vec::new(),
            labels: vec!["bug".into()],
        };
        let controller = start(&page, config);

        controller.test_fill().await;
        // config round-trip orders us behind the queued pass
        let _ = controller.config().await.unwrap();

        let report = controller.last_report().await.unwrap().unwrap();
        assert_eq!(report.committed, vec![AttemptKey::labels(&["bug".into()])]);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn requests_during_a_running_pass_are_dropped() {
        let page = Arc::new(FakePage::new());
        label_form(&page);
        let held = HeldPage::new(page.clone());
        let config = FillConfig {
            enabled: true,
            assignee: String::new(),
            reviewers: Vec::new(),
            labels: vec!["bug".into()],
        };
        let controller = Controller::start(
            held.clone() as Arc<dyn DomPort>,
            Arc::new(MemoryStore::new(config)),
            SelectPolicy::immediate(),
            ReadinessPolicy::immediate(),
        );

        controller.test_fill().await;
        // the pass is now parked inside its first readiness probe
        held.entered.notified().await;

        // both arrive while Running and must vanish, not queue
        controller.signal_mutation().await;
        controller.test_fill().await;

        held.release.notify_one();
        let _ = controller.config().await.unwrap();

        // a queued second pass would have overwritten the report with a
        // skipped-only one and re-touched the page
        let report = controller.last_report().await.unwrap().unwrap();
        assert_eq!(report.committed, vec![AttemptKey::labels(&["bug".into()])]);
        assert!(report.skipped.is_empty());
        assert_eq!(page.interaction_count(), 2);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn navigation_resets_the_completed_set() {
        let page = Arc::new(FakePage::new());
        label_form(&page);
        let config = FillConfig {
            enabled: true,
            assignee: String::new(),
            reviewers: Vec::new(),
            labels: vec!["bug".into()],
        };
        let controller = start(&page, config);
        let key = AttemptKey::labels(&["bug".into()]);

        controller.test_fill().await;
        let _ = controller.config().await.unwrap();

        controller.signal_navigation().await;
        let _ = controller.config().await.unwrap();

        let report = controller.last_report().await.unwrap().unwrap();
        assert_eq!(report.committed, vec![key]);
        assert!(report.skipped.is_empty());
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn reload_config_picks_up_store_changes() {
        let page = Arc::new(FakePage::new());
        let store = Arc::new(MemoryStore::new(FillConfig::default()));
        let controller = Controller::start(
            page.clone() as Arc<dyn DomPort>,
            store.clone(),
            SelectPolicy::immediate(),
            ReadinessPolicy::immediate(),
        );

        let updated = FillConfig {
            enabled: true,
            assignee: "alice".into(),
            reviewers: Vec::new(),
            labels: Vec::new(),
        };
        store.save(&updated).unwrap();
        assert_eq!(controller.config().await.unwrap(), FillConfig::default());

        controller.reload_config().await.unwrap();
        assert_eq!(controller.config().await.unwrap(), updated);
        controller.shutdown().await;
    }
}
