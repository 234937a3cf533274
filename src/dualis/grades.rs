//! Course detail pages: course name and examination rows.

use crate::dualis::errors::{CrawlError, Stage};
use crate::dualis::session::Session;
use futures::{StreamExt, TryStreamExt, stream};
use html_scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info};

/// Position of the examination type among a row's `tbdata` cells.
pub const EXAM_TYPE_COLUMN: usize = 1;
/// Position of the grade among a row's `tbdata` cells.
pub const GRADE_COLUMN: usize = 3;

static HEADING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static TABLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static DATA_CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"td[class="tbdata"]"#).unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Examination {
    pub exam_type: String,
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Raw inner HTML of the page heading; may contain markup.
    pub name: String,
    pub examinations: Vec<Examination>,
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_owned()
}

/// Examination from one table row, if it names an examination type.
fn parse_row(row: ElementRef<'_>) -> Option<Examination> {
    let mut exam_type = String::new();
    let mut grade = String::new();

    for (position, cell) in row.select(&DATA_CELL_SELECTOR).enumerate() {
        match position {
            EXAM_TYPE_COLUMN => exam_type = cell_text(cell),
            GRADE_COLUMN => grade = cell_text(cell),
            _ => {}
        }
    }

    (!exam_type.is_empty()).then_some(Examination { exam_type, grade })
}

/// Parse a course detail page.
///
/// Only the first table is read; rows without an examination type (headers,
/// spacers, totals) are dropped.
pub fn parse_course(body: &str) -> Course {
    let html = Html::parse_document(body);

    let name = html
        .select(&HEADING_SELECTOR)
        .next()
        .map(|h1| h1.inner_html())
        .unwrap_or_default();

    let examinations: Vec<Examination> = html
        .select(&TABLE_SELECTOR)
        .next()
        .map(|table| table.select(&ROW_SELECTOR).filter_map(parse_row).collect())
        .unwrap_or_default();

    Course { name, examinations }
}

/// Fetch and parse every detail page; courses come back in link order.
pub async fn fetch_courses(
    session: &Session,
    links: &[String],
    concurrency: usize,
) -> Result<Vec<Course>, CrawlError> {
    let courses: Vec<Course> = stream::iter(links)
        .map(|link| async move {
            let page = session.get(Stage::Grades, link).await?;
            let course = parse_course(&page.body);
            debug!(
                course = course.name.as_str(),
                examinations = course.examinations.len(),
                "parsed course"
            );
            Ok::<_, CrawlError>(course)
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    info!(count = courses.len(), "parsed courses");
    Ok(courses)
}
