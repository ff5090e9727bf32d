use super::args::*;
use geolens_core::config::{load_settings, Settings, DEFAULT_CONFIG_PATH};
use geolens_core::errors::ConfigError;
use geolens_core::storage::{open_blob_store, BlobStore, HistoryStore, TargetList};
use std::path::PathBuf;
use std::sync::Arc;

pub mod audit;
pub mod dashboard;
pub mod history;
pub mod init;
pub mod targets;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const AUDIT_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

/// Resolved settings plus the store they point at, shared by every command.
pub struct AppContext {
    pub settings: Settings,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppContext {
    pub fn targets(&self) -> TargetList {
        TargetList::new(self.blobs.clone(), self.settings.files.targets.clone())
    }

    pub fn history(&self) -> HistoryStore {
        HistoryStore::new(self.blobs.clone(), self.settings.files.history.clone())
    }
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Init(args) => init::run(args, &config_path(&cli.global)),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
        cmd => {
            let ctx = match open_context(&cli.global) {
                Ok(ctx) => ctx,
                Err(e) => {
                    eprintln!("config error: {e:#}");
                    return Ok(exit_codes::CONFIG_ERROR);
                }
            };
            match cmd {
                Command::Audit(args) => audit::run(args, &ctx).await,
                Command::Targets(args) => targets::run(args, &ctx).await,
                Command::Dashboard(args) => dashboard::run(args, &ctx).await,
                Command::History(args) => history::run(args, &ctx).await,
                Command::Init(_) | Command::Version => Ok(exit_codes::OK),
            }
        }
    }
}

fn config_path(global: &GlobalArgs) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn open_context(global: &GlobalArgs) -> anyhow::Result<AppContext> {
    let path = config_path(global);
    let mut settings = load_settings(&path, global.config.is_some(), global.strict)?;
    settings.resolve_from_env()?;
    let blobs = open_blob_store(&settings.store)?;
    tracing::debug!(
        event = "geolens.cli.context",
        config = %path.display(),
        backend = blobs.backend_name(),
        targets = %settings.files.targets,
        history = %settings.files.history,
    );
    Ok(AppContext { settings, blobs })
}

/// Exit code for an error that escaped a command: configuration problems
/// are `CONFIG_ERROR`, anything that failed while running is `AUDIT_FAILED`.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        exit_codes::CONFIG_ERROR
    } else {
        exit_codes::AUDIT_FAILED
    }
}

pub(crate) fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{:.*}", precision, x))
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_code_for_errors() {
        let cfg: anyhow::Result<()> = Err(ConfigError("bad backend".into()).into());
        let cfg = cfg.context("loading settings").unwrap_err();
        assert_eq!(exit_code_for(&cfg), exit_codes::CONFIG_ERROR);

        let io = anyhow::anyhow!("refusing to append: existing history could not be read");
        assert_eq!(exit_code_for(&io), exit_codes::AUDIT_FAILED);
    }
}
