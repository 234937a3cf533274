use crate::cli::Args;
use crate::config::Config;
use crate::dualis::crawl_with_cancel;
use crate::notify::{LogNotifier, Notification, Notifier};
use crate::store::{JsonFileStore, record_crawl};
use crate::utils::fmt_duration;
use anyhow::Context;
use std::process::ExitCode;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// One invocation of the crawler binary.
pub struct App {
    config: Config,
    args: Args,
}

impl App {
    pub fn new(config: Config, args: Args) -> Self {
        Self { config, args }
    }

    /// Run the crawl and map the outcome to a process exit code.
    pub async fn run(self) -> ExitCode {
        match self.execute().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = ?e, "crawl failed");
                ExitCode::FAILURE
            }
        }
    }

    async fn execute(&self) -> Result<(), anyhow::Error> {
        let credentials = self.config.credentials(self.args.username.as_deref())?;
        let mut crawl_config = self.config.crawl_config()?;
        if let Some(concurrency) = self.args.concurrency {
            crawl_config.concurrency = concurrency.max(1);
        }

        // Ctrl-C cancels in-flight requests instead of killing the process mid-write.
        let cancel = CancellationToken::new();
        let interrupt = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling crawl");
                    cancel.cancel();
                }
            }
        });

        let start = Instant::now();
        let result = crawl_with_cancel(&credentials, &crawl_config, cancel).await;
        interrupt.abort();
        let courses = result.context("Failed to crawl portal")?;

        info!(
            courses = courses.len(),
            duration = fmt_duration(start.elapsed()),
            "crawl finished"
        );
        println!("{}", serde_json::to_string_pretty(&courses)?);

        if self.args.no_store {
            return Ok(());
        }

        let store = JsonFileStore::new(&self.config.snapshot_dir);
        let changes = record_crawl(&store, &credentials.username, &courses, self.args.diff)
            .await
            .context("Failed to update snapshot")?;

        if changes.is_empty() {
            info!("no grade changes since last crawl");
            return Ok(());
        }
        info!(changed = changes.len(), "grade changes detected");

        match &self.config.notify_email {
            Some(to) => {
                let notification = Notification::compose(&changes);
                LogNotifier
                    .send(to, &notification)
                    .await
                    .context("Failed to send notification")?;
            }
            None => info!("no notify_email configured, skipping notification"),
        }

        Ok(())
    }
}
