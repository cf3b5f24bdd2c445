mod app;
mod cli;
mod components;
mod mpv;
mod theme;
mod widgets;

use clap::Parser;
use globe_proto::config::Config;
use globe_proto::storage::JsonFileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let data_dir = globe_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = globe_proto::platform::log_file();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG overrides; keep HTTP client internals quiet by default
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("globe-radio log: {}", log_path.display());
    tracing::info!("globe-radio starting…");

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_default(),
    };
    args.apply(&mut config);
    tracing::info!("catalog source: {}", config.catalog.source);

    if let Some(parent) = config.paths.storage_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = JsonFileStore::open(&config.paths.storage_file);

    let app = app::TuiApp::new(&config, store);
    app.run(config.catalog.source.clone()).await?;

    tracing::info!("globe-radio exiting");
    Ok(())
}
