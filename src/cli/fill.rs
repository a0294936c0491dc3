use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use mrfill_autofill::{ConfigStore, FillEngine, JsonFileStore, ReadinessPolicy};
use mrfill_core_types::PassTrigger;
use mrfill_dom_adapter::DomPort;
use mrfill_select_driver::SelectPolicy;
use tracing::warn;

use crate::cli::run::{open_page, ConnectArgs};
use crate::cli::status;

#[derive(Args, Debug)]
pub struct FillArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

/// One forced pass, route gate bypassed, report to stdout.
pub async fn cmd_fill(args: FillArgs, store: JsonFileStore) -> Result<()> {
    let (session, page) = open_page(&args.connect).await?;
    let dom: Arc<dyn DomPort> = Arc::new(page);

    let config = store.load()?;
    let report_path = status::report_path(&store);
    let mut engine = FillEngine::new(dom, SelectPolicy::default(), ReadinessPolicy::default());
    let report = engine.run_pass(&config, PassTrigger::Forced).await;

    if !report.form_ready {
        warn!("the merge-request form never became ready");
    }
    status::persist_report(&report_path, &report);
    println!("{}", serde_json::to_string_pretty(&report)?);

    session.close().await;
    Ok(())
}
