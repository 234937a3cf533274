//! Change notifications: message composition and delivery seam.

use crate::dualis::Course;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

const SUBJECT: &str = "Es sind neue Bewertungen in Dualis verfügbar!";
const INTRO: &str = "Folgende Module haben neue Bewertungen:";
const OUTRO: &str = "Vielen Dank für dein Vertrauen in den Dualis-Bot!";

/// A composed message with HTML and plain-text bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

impl Notification {
    /// Message listing every changed course and its examinations.
    ///
    /// Course names are already portal HTML and go in as-is; examination text
    /// is escaped.
    pub fn compose(changes: &[Course]) -> Self {
        let mut html_body = format!("<h3>{INTRO}</h3><br>");
        let mut text_body = format!("{INTRO}\n\n");

        for course in changes {
            html_body.push_str(&format!("<br>{}:<br>", course.name));
            text_body.push_str(&format!("{}:\n", course.name));
            for exam in &course.examinations {
                html_body.push_str(&format!(
                    "{}: <b>{}</b><br>",
                    html_escape::encode_text(&exam.exam_type),
                    html_escape::encode_text(&exam.grade)
                ));
                text_body.push_str(&format!("{}: {}\n", exam.exam_type, exam.grade));
            }
        }

        html_body.push_str(&format!("<br>{OUTRO}"));
        text_body.push_str(&format!("\n{OUTRO}"));

        Self {
            subject: SUBJECT.to_owned(),
            html_body,
            text_body,
        }
    }
}

/// Delivers notifications. Failures are returned, never retried here.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, notification: &Notification) -> Result<()> {
        info!(
            to,
            subject = notification.subject.as_str(),
            body = notification.text_body.as_str(),
            "grade change notification"
        );
        Ok(())
    }
}
