use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use mrfill_autofill::{Controller, JsonFileStore, ReadinessPolicy};
use mrfill_dom_adapter::{CdpDom, CdpSession, DomPort};
use mrfill_page_catalog::TARGET_ROUTE_FRAGMENT;
use mrfill_select_driver::SelectPolicy;
use tokio::signal;
use tokio::time::interval;
use tracing::{info, warn};

use crate::cli::status;

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Attach to a running browser over its DevTools websocket
    #[arg(long, value_name = "WS_URL")]
    pub attach: Option<String>,

    /// Open this URL in a freshly launched browser
    #[arg(long, conflicts_with = "attach")]
    pub url: Option<String>,

    /// Launch the browser headless (ignored with --attach)
    #[arg(long)]
    pub headless: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Page poll interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub poll_ms: u64,
}

/// Connect or launch, then pick the page to watch. Attaching without a
/// URL grabs the first open merge-request tab.
pub(crate) async fn open_page(connect: &ConnectArgs) -> Result<(CdpSession, CdpDom)> {
    if connect.attach.is_none() && connect.url.is_none() {
        bail!("--url is required unless --attach is given");
    }
    let session = match &connect.attach {
        Some(ws) => CdpSession::connect(ws).await?,
        None => CdpSession::launch(connect.headless).await?,
    };
    let page = match &connect.url {
        Some(url) => session.open(url).await?,
        None => session.attach(TARGET_ROUTE_FRAGMENT).await?,
    };
    Ok((session, page))
}

pub async fn cmd_run(args: RunArgs, store: JsonFileStore) -> Result<()> {
    let (session, page) = open_page(&args.connect).await?;
    let dom: Arc<dyn DomPort> = Arc::new(page);
    let report_path = status::report_path(&store);

    let controller = Controller::start(
        dom.clone(),
        Arc::new(store),
        SelectPolicy::default(),
        ReadinessPolicy::default(),
    );

    let mut last_path = dom.location_path().await.unwrap_or_default();
    let mut last_finished: Option<DateTime<Utc>> = None;
    let mut ticker = interval(Duration::from_millis(args.poll_ms.max(100)));

    info!(path = %last_path, "watching page, Ctrl+C to stop");
    controller.signal_mutation().await;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("stopping");
                break;
            }
            _ = ticker.tick() => {
                match dom.location_path().await {
                    Ok(path) if path != last_path => {
                        info!(%path, "page changed");
                        last_path = path;
                        controller.signal_navigation().await;
                    }
                    Ok(path) if path.contains(TARGET_ROUTE_FRAGMENT) => {
                        controller.signal_mutation().await;
                    }
                    Ok(_) => {}
                    Err(err) => warn!(%err, "page poll failed"),
                }
                if let Ok(Some(report)) = controller.last_report().await {
                    if Some(report.finished_at) != last_finished {
                        last_finished = Some(report.finished_at);
                        if !report.committed.is_empty() {
                            info!(committed = report.committed.len(), "pass committed fields");
                        }
                        status::persist_report(&report_path, &report);
                    }
                }
            }
        }
    }

    controller.shutdown().await;
    session.close().await;
    Ok(())
}
