//! The crawl pipeline: login, navigate, enumerate, extract, parse.

use crate::dualis::CrawlConfig;
use crate::dualis::errors::CrawlError;
use crate::dualis::grades::{Course, fetch_courses};
use crate::dualis::links::collect_detail_links;
use crate::dualis::login::{Credentials, login};
use crate::dualis::navigation::resolve_grade_page;
use crate::dualis::semesters::enumerate_semesters;
use crate::dualis::session::Session;
use crate::utils::fmt_duration;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};

/// Crawl all courses and grades for one account.
pub async fn crawl(
    credentials: &Credentials,
    config: &CrawlConfig,
) -> Result<Vec<Course>, CrawlError> {
    crawl_with_cancel(credentials, config, CancellationToken::new()).await
}

/// Like [`crawl`], but aborts when `cancel` fires.
///
/// The crawl runs on a child of `cancel`, so cancelling the caller's token
/// stops it while its own timeout never touches the caller's token. The whole
/// pipeline is bounded by `config.crawl_timeout`.
pub async fn crawl_with_cancel(
    credentials: &Credentials,
    config: &CrawlConfig,
    cancel: CancellationToken,
) -> Result<Vec<Course>, CrawlError> {
    let cancel = cancel.child_token();
    let session = Session::new(config, cancel.clone())?;
    let span = info_span!("crawl", username = credentials.username.as_str());

    let result = tokio::time::timeout(
        config.crawl_timeout,
        run_pipeline(&session, credentials, config.concurrency).instrument(span),
    )
    .await;

    match result {
        Ok(courses) => courses,
        Err(_elapsed) => {
            cancel.cancel();
            Err(CrawlError::Timeout {
                after: config.crawl_timeout,
            })
        }
    }
}

async fn run_pipeline(
    session: &Session,
    credentials: &Credentials,
    concurrency: usize,
) -> Result<Vec<Course>, CrawlError> {
    let start = Instant::now();

    let target = login(session, credentials).await?;
    let grade_page = resolve_grade_page(session, &target).await?;
    let semesters = enumerate_semesters(session, &grade_page).await?;
    let links = collect_detail_links(session, &grade_page, &semesters, concurrency).await?;
    let courses = fetch_courses(session, &links, concurrency).await?;

    info!(
        semesters = semesters.len(),
        courses = courses.len(),
        duration = fmt_duration(start.elapsed()),
        "crawl complete"
    );
    Ok(courses)
}
