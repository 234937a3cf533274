//! Client for the Dualis (CampusNet) student portal.
//!
//! The portal has no API. Everything is driven through `mgrqispi.dll` pages:
//! a login form with hidden parameters, a hand-injected auth cookie, `Refresh`
//! headers and `URL=` text markers for navigation, and grade data buried in
//! `tbdata` table cells and inline `dl_popUp(...)` script calls.

pub mod crawler;
pub mod errors;
pub mod grades;
pub mod links;
pub mod login;
pub mod navigation;
pub mod semesters;
pub mod session;

pub use crawler::{crawl, crawl_with_cancel};
pub use errors::{CrawlError, Stage};
pub use grades::{Course, Examination};
pub use login::Credentials;
pub use session::{PortalResponse, Session};

use std::time::Duration;
use url::Url;

/// Public origin of the portal.
pub const DEFAULT_BASE_URL: &str = "https://dualis.dhbw.de";

/// Settings for a single crawl, independent of how they were loaded.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: Url,
    /// Per-request timeout enforced by the HTTP client.
    pub request_timeout: Duration,
    /// Deadline for the whole pipeline.
    pub crawl_timeout: Duration,
    /// Extra attempts for transport failures only.
    pub max_retries: u32,
    pub retry_backoff: Duration,
    /// How many semester or detail pages may be in flight at once.
    pub concurrency: usize,
}

impl CrawlConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: Duration::from_secs(30),
            crawl_timeout: Duration::from_secs(5 * 60),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            concurrency: 1,
        }
    }
}
