//! Course detail links hidden in the per-semester result listings.
//!
//! Each course row has a `tbdata` cell with an inline script like
//! `dl_popUp("/scripts/mgrqispi.dll?...RESULTDETAILS...","Resultdetails",...)`.
//! The first quoted argument is the detail page URL.

use crate::dualis::errors::{CrawlError, Stage};
use crate::dualis::session::Session;
use futures::{StreamExt, TryStreamExt, stream};
use html_scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, info};

const POPUP_MARKER: &str = "dl_popUp(";

static DATA_CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"td[class="tbdata"]"#).unwrap());
static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").unwrap());

/// Listing URL for one semester: the semester id is appended as a `-N` argument.
pub fn semester_url(grade_page: &str, semester: &str) -> String {
    format!("{grade_page}-N{semester}")
}

/// First quoted argument of the `dl_popUp(` call in a script.
pub fn extract_popup_url(script: &str) -> Option<&str> {
    let start = script.find(POPUP_MARKER)? + POPUP_MARKER.len();
    let rest = script[start..].trim_start().strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// Detail links of a listing page, in row order.
///
/// Cells without inline script are layout rows and are skipped. A cell whose
/// script doesn't contain a well-formed `dl_popUp("...")` call means the
/// listing markup changed, which is reported rather than guessed around.
pub fn parse_detail_links(body: &str, url: &str) -> Result<Vec<String>, CrawlError> {
    let html = Html::parse_document(body);
    let mut links = Vec::new();

    for cell in html.select(&DATA_CELL_SELECTOR) {
        let script: String = cell
            .select(&SCRIPT_SELECTOR)
            .flat_map(|s| s.text())
            .collect();
        if script.is_empty() {
            continue;
        }

        let link = extract_popup_url(&script).ok_or_else(|| {
            CrawlError::navigation(
                Stage::DetailLinks,
                url,
                format!("detail link marker not found in script: {:?}", script.trim()),
            )
        })?;
        links.push(link.to_owned());
    }

    Ok(links)
}

/// Fetch every semester listing and collect detail links, semester by semester.
///
/// Up to `concurrency` listings are fetched at once; output order always
/// follows `semesters`.
pub async fn collect_detail_links(
    session: &Session,
    grade_page: &str,
    semesters: &[String],
    concurrency: usize,
) -> Result<Vec<String>, CrawlError> {
    let per_semester: Vec<Vec<String>> = stream::iter(semesters)
        .map(|semester| async move {
            let url = semester_url(grade_page, semester);
            let page = session.get(Stage::DetailLinks, &url).await?;
            let links = parse_detail_links(&page.body, &page.url)?;
            debug!(
                semester = semester.as_str(),
                count = links.len(),
                "collected detail links"
            );
            Ok::<_, CrawlError>(links)
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let links: Vec<String> = per_semester.into_iter().flatten().collect();
    info!(count = links.len(), "collected course detail links");
    Ok(links)
}
