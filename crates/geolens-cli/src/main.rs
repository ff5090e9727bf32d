use clap::Parser;

mod cli;

use cli::args::Cli;
use cli::commands::{dispatch, exit_code_for};
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging() {
    let level = std::env::var("GEOLENS_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("GEOLENS_LOG_FORMAT").ok().as_deref() == Some("json");

    // stdout is reserved for command output.
    if json {
        fmt()
            .with_env_filter(filter)
            .json()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_target(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging();
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
