//! Markdown export of a persisted course

use crate::models::PersistedCourse;
use std::fmt::Write;

/// Render a course tree as a markdown document
pub fn render_markdown(course: &PersistedCourse) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "# {}\n", course.title);
    if !course.description.is_empty() {
        let _ = writeln!(out, "{}\n", course.description);
    }

    for module in &course.modules {
        let _ = writeln!(out, "## {}\n", module.heading);
        if !module.summary.is_empty() {
            let _ = writeln!(out, "{}\n", module.summary);
        }
        if !module.key_takeaways.is_empty() {
            out.push_str("### Key Takeaways\n\n");
            for takeaway in &module.key_takeaways {
                let _ = writeln!(out, "- {}", takeaway.content);
            }
            out.push('\n');
        }
    }

    out
}

/// Download file name: lower-cased title, whitespace runs as `-`
pub fn export_filename(title: &str) -> String {
    let slug = title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "course".to_string() } else { slug };
    format!("{}.md", slug)
}
