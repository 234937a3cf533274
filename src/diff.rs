//! Change detection between two crawls.
//!
//! The crawl itself never diffs; callers pick the granularity.

use crate::dualis::{Course, Examination};
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DiffGranularity {
    /// A course counts as changed unless an identical course was seen before.
    Course,
    /// Only examinations not seen before under the same course name are reported.
    Examination,
}

/// Courses (or parts of courses) in `current` that are new relative to `previous`.
///
/// An empty `previous` means there is no baseline yet, so nothing is reported.
pub fn diff_courses(
    previous: &[Course],
    current: &[Course],
    granularity: DiffGranularity,
) -> Vec<Course> {
    if previous.is_empty() {
        return Vec::new();
    }

    match granularity {
        DiffGranularity::Course => current
            .iter()
            .filter(|course| !previous.contains(course))
            .cloned()
            .collect(),
        DiffGranularity::Examination => current
            .iter()
            .filter_map(|course| new_examinations(previous, course))
            .collect(),
    }
}

fn new_examinations(previous: &[Course], course: &Course) -> Option<Course> {
    let seen: Vec<&Examination> = previous
        .iter()
        .filter(|old| old.name == course.name)
        .flat_map(|old| old.examinations.iter())
        .collect();

    let examinations: Vec<Examination> = course
        .examinations
        .iter()
        .filter(|exam| !seen.contains(exam))
        .cloned()
        .collect();

    (!examinations.is_empty()).then(|| Course {
        name: course.name.clone(),
        examinations,
    })
}
