mod cli;
use cli::{parse_cli_options, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();

    let options = match parse_cli_options() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("Error: {}", err);
            println!("Usage: dashcal [--date YYYY/MM/DD] [--period 1|3|5|week|month] [--refresh]");
            return Ok(());
        }
    };

    run(options).await
}

fn setup_logging() {
    let log_dir = dirs::config_dir()
        .map(|d| d.join("dashcal"))
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "dashcal.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    std::mem::forget(_guard);

    tracing::info!("dashcal started");
}
