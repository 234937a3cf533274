//! From the post-login refresh target to the grade overview link.

use crate::dualis::errors::{CrawlError, Stage};
use crate::dualis::session::Session;
use html_scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

/// Text marker preceding the start page URL in the refresh page body.
const URL_MARKER: &str = "URL=";

/// Navigation anchor for "Prüfungsergebnisse". Matched on the exact class
/// attribute, trailing space included.
static GRADE_LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[class="depth_1 link000307 navLink "]"#).unwrap()
});

/// Start page URL embedded in free text as `URL=...` up to the next `"`.
///
/// The directive lives inside a `<meta>`-like blob that isn't reliably
/// parseable as markup, so this is a plain substring search.
pub fn extract_start_page_url(body: &str) -> Option<&str> {
    let start = body.find(URL_MARKER)? + URL_MARKER.len();
    let rest = &body[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// `href` of the grade overview navigation link.
pub fn extract_grade_page_link(body: &str) -> Option<String> {
    let html = Html::parse_document(body);
    html.select(&GRADE_LINK_SELECTOR)
        .next()
        .and_then(|a| a.attr("href"))
        .map(str::to_owned)
}

/// Follow the refresh target to the start page and return the grade overview URL.
pub async fn resolve_grade_page(session: &Session, target: &str) -> Result<String, CrawlError> {
    let refresh_page = session.get(Stage::Navigation, target).await?;
    let start_page_url = extract_start_page_url(&refresh_page.body)
        .ok_or_else(|| {
            CrawlError::navigation(
                Stage::Navigation,
                &refresh_page.url,
                "start page URL marker not found",
            )
        })?
        .to_owned();
    debug!(url = start_page_url.as_str(), "resolved start page");

    let start_page = session.get(Stage::Navigation, &start_page_url).await?;
    let grade_page = extract_grade_page_link(&start_page.body).ok_or_else(|| {
        CrawlError::navigation(
            Stage::Navigation,
            &start_page.url,
            "grade page link not found",
        )
    })?;
    debug!(url = grade_page.as_str(), "resolved grade overview");

    Ok(grade_page)
}
