use super::exit_codes;
use crate::cli::args::InitArgs;
use std::path::Path;

const GITIGNORE: &str = "/.geolens/\n*.db\n*.db-shm\n*.db-wal\n";

pub fn run(args: InitArgs, config: &Path) -> anyhow::Result<i32> {
    if config.exists() {
        eprintln!("note: {} already exists", config.display());
    } else {
        if let Some(parent) = config.parent() {
            std::fs::create_dir_all(parent)?;
        }
        geolens_core::config::write_sample_config(config)?;
        eprintln!("created {}", config.display());
    }

    if args.gitignore {
        let gi = config
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(".gitignore");
        if gi.exists() {
            eprintln!("note: {} already exists (skipped)", gi.display());
        } else {
            std::fs::write(&gi, GITIGNORE)?;
            eprintln!("created {}", gi.display());
        }
    }

    Ok(exit_codes::OK)
}
