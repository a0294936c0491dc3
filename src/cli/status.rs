use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mrfill_autofill::JsonFileStore;
use mrfill_core_types::PassReport;
use tracing::debug;

/// Sits next to the active config file (honoring `--config`); `run` and
/// `fill` rewrite it after every pass so `status` works across invocations.
pub fn report_path(store: &JsonFileStore) -> PathBuf {
    store.path().with_file_name("last-report.json")
}

/// Best-effort persistence; a failed write only costs the status output.
pub fn persist_report(path: &Path, report: &PassReport) {
    let write = || -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(report)?)?;
        Ok(())
    };
    if let Err(err) = write() {
        debug!(%err, path = %path.display(), "could not persist pass report");
    }
}

pub fn cmd_status(store: JsonFileStore) -> Result<()> {
    let path = report_path(&store);
    match fs::read_to_string(&path) {
        Ok(raw) => {
            println!("{raw}");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            println!("no fill pass recorded yet");
            Ok(())
        }
        Err(err) => {
            Err(err).with_context(|| format!("reading pass report {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrfill_core_types::PassTrigger;

    #[test]
    fn report_sits_next_to_the_active_config_file() {
        let store = JsonFileStore::new("/tmp/elsewhere/settings/config.json");
        assert_eq!(
            report_path(&store),
            PathBuf::from("/tmp/elsewhere/settings/last-report.json")
        );
    }

    #[test]
    fn persisted_report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("config.json"));
        let path = report_path(&store);

        let report = PassReport::new(PassTrigger::Forced).finish();
        persist_report(&path, &report);

        let raw = fs::read_to_string(&path).unwrap();
        let loaded: PassReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(loaded.trigger, PassTrigger::Forced);
        assert_eq!(loaded.started_at, report.started_at);
    }
}
