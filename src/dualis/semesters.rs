//! Semester choices on the grade overview page.

use crate::dualis::errors::{CrawlError, Stage};
use crate::dualis::session::Session;
use html_scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{info, warn};

static SEMESTER_OPTION_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"select[id="semester"] option"#).unwrap());

/// `value` of every semester option, in document order.
pub fn parse_semesters(body: &str) -> Vec<String> {
    let html = Html::parse_document(body);
    html.select(&SEMESTER_OPTION_SELECTOR)
        .map(|option| option.attr("value").unwrap_or_default().to_owned())
        .collect()
}

/// Fetch the grade overview and list its semester ids.
pub async fn enumerate_semesters(
    session: &Session,
    grade_page: &str,
) -> Result<Vec<String>, CrawlError> {
    let page = session.get(Stage::Semesters, grade_page).await?;
    let semesters = parse_semesters(&page.body);

    if semesters.is_empty() {
        warn!(url = page.url.as_str(), "no semesters found on grade overview");
    } else {
        info!(count = semesters.len(), "found semesters");
    }
    Ok(semesters)
}
