use clap::Parser;
use dualis_crawler::app::App;
use dualis_crawler::cli::Args;
use dualis_crawler::config::Config;
use dualis_crawler::logging::setup_logging;
use std::process::ExitCode;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Load config and setup logging before anything else so no startup logs are dropped
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:?}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        base_url = config.base_url.as_str(),
        "starting dualis-crawler"
    );

    App::new(config, args).run().await
}
