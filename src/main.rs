use clap::Parser;
use log::info;
use pax_reporter::config::Settings;
use pax_reporter::network::{Reporter, ReporterMessage};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the local settings file
    #[arg(short, long, default_value = "config.json")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let settings = Settings::load(&args.config)?;
    info!("Starting PAX+ server reporting client");
    info!("Masterserver: {}", settings.masterserver_url);

    let mut reporter = Reporter::new(settings).await?;

    // Ctrl+C delists all servers before the process exits
    let shutdown_tx = reporter.message_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            let _ = shutdown_tx.send(ReporterMessage::Shutdown);
        }
    });

    reporter.run().await
}
