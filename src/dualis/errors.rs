//! Error types for the portal crawl pipeline.

use std::fmt;
use std::time::Duration;

/// Pipeline stage in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Login,
    Navigation,
    Semesters,
    DetailLinks,
    Grades,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Login => "login",
            Stage::Navigation => "navigation",
            Stage::Semesters => "semesters",
            Stage::DetailLinks => "detail_links",
            Stage::Grades => "grades",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("request to {url} failed during {stage}")]
    Transport {
        stage: Stage,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("authentication failed at {url}: {reason}")]
    Authentication { url: String, reason: String },
    #[error("navigation failed during {stage} at {url}: {reason}")]
    Navigation {
        stage: Stage,
        url: String,
        reason: String,
    },
    #[error("crawl cancelled during {stage} ({url})")]
    Cancelled { stage: Stage, url: String },
    #[error("crawl timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("failed to build http client")]
    Client(#[source] reqwest::Error),
    #[error("invalid portal url {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl CrawlError {
    pub(crate) fn navigation(stage: Stage, url: &str, reason: impl Into<String>) -> Self {
        CrawlError::Navigation {
            stage,
            url: url.to_owned(),
            reason: reason.into(),
        }
    }

    /// Only transport failures may succeed on a second attempt; everything
    /// else means the portal markup or the credentials don't match.
    pub fn is_transient(&self) -> bool {
        matches!(self, CrawlError::Transport { .. })
    }

    /// Stage the failure is attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CrawlError::Transport { stage, .. }
            | CrawlError::Navigation { stage, .. }
            | CrawlError::Cancelled { stage, .. } => Some(*stage),
            CrawlError::Authentication { .. } => Some(Stage::Login),
            CrawlError::Timeout { .. } | CrawlError::Client(_) | CrawlError::InvalidUrl { .. } => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_error_message_includes_stage_and_url() {
        let err = CrawlError::navigation(Stage::Navigation, "/start", "grade page link not found");
        assert_eq!(
            err.to_string(),
            "navigation failed during navigation at /start: grade page link not found"
        );
        assert_eq!(err.stage(), Some(Stage::Navigation));
    }

    #[test]
    fn test_only_transport_is_transient() {
        let auth = CrawlError::Authentication {
            url: "/login".into(),
            reason: "no Set-Cookie header".into(),
        };
        assert!(!auth.is_transient());
        assert_eq!(auth.stage(), Some(Stage::Login));

        let timeout = CrawlError::Timeout {
            after: Duration::from_secs(1),
        };
        assert!(!timeout.is_transient());
        assert_eq!(timeout.stage(), None);
    }
}
