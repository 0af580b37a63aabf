//! CLI output formatting for a simulated session.
//!
//! Each `format_*` function is pure and returns `Vec<String>` so it can be
//! tested without capturing stdout; the `print_*` wrappers write the lines.
//!
//! ```text
//! ==> [3/5] generate
//!     analysis 0%
//!     background-removal 20%
//!     …
//!     done 100% (4 artifacts)
//!
//! Session 6f1c…
//!     Sources
//!         001 front.jpg
//!     Style
//!         model type: female
//!     Artifacts
//!         001 https://…/0.png ★
//!             brightness(1.1) contrast(1) saturate(1)
//!
//! Export
//! 001 https://…/0.png → png @ original
//! ```

use crate::adjust;
use crate::job::JobStatus;
use crate::style::Facet;
use crate::types::ExportRequest;
use crate::workflow::{Stage, WorkflowSession};

/// Format a 0-based index as a 1-based, 3-digit zero-padded position.
fn format_index(index: usize) -> String {
    format!("{:0>3}", index + 1)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

pub fn format_stage_banner(stage: Stage) -> String {
    format!(
        "==> [{}/{}] {}",
        stage.position(),
        Stage::ALL.len(),
        stage
    )
}

pub fn format_progress(status: &JobStatus) -> String {
    if status.complete {
        let count = status.artifacts.as_ref().map_or(0, Vec::len);
        format!(
            "{}done {}% ({} artifacts)",
            indent(1),
            status.progress_percent,
            count
        )
    } else {
        format!(
            "{}{} {}%",
            indent(1),
            status.stage.as_deref().unwrap_or("working"),
            status.progress_percent
        )
    }
}

pub fn format_session(session: &WorkflowSession) -> Vec<String> {
    let mut lines = vec![format!("Session {}", session.session_id)];

    lines.push(format!("{}Sources", indent(1)));
    for (i, image) in session.source_images.iter().enumerate() {
        lines.push(format!("{}{} {}", indent(2), format_index(i), image.id));
    }

    lines.push(format!("{}Style", indent(1)));
    for facet in Facet::ALL {
        let value = session.style_choice.get(facet).unwrap_or("-");
        lines.push(format!("{}{}: {}", indent(2), facet, value));
    }

    lines.push(format!("{}Artifacts", indent(1)));
    let edit = &session.edit_state;
    for (i, artifact) in session.artifacts.iter().enumerate() {
        let star = if edit.favorites.contains(i) { " ★" } else { "" };
        let download = if session.download_selection.contains(i) {
            " ↓"
        } else {
            ""
        };
        lines.push(format!(
            "{}{} {}{}{}",
            indent(2),
            format_index(i),
            artifact,
            star,
            download
        ));
        if let Some(params) = edit.adjustments.get(i).filter(|p| !p.is_neutral()) {
            let rendered = adjust::render(artifact, params);
            lines.push(format!("{}{}", indent(3), rendered.to_css_filter()));
        }
    }

    lines
}

pub fn format_export_plan(plan: &[ExportRequest]) -> Vec<String> {
    let mut lines = vec!["Export".to_string()];
    for request in plan {
        lines.push(format!(
            "{} {} → {} @ {}",
            format_index(request.index),
            request.artifact,
            request.format,
            request.resolution
        ));
        if request.render.sharpness != 0 {
            lines.push(format!("{}sharpness: {}", indent(1), request.render.sharpness));
        }
    }
    lines
}

pub fn print_stage_banner(stage: Stage) {
    println!("{}", format_stage_banner(stage));
}

pub fn print_progress(status: &JobStatus) {
    println!("{}", format_progress(status));
}

pub fn print_session(session: &WorkflowSession) {
    for line in format_session(session) {
        println!("{}", line);
    }
}

pub fn print_export_plan(plan: &[ExportRequest]) {
    for line in format_export_plan(plan) {
        println!("{}", line);
    }
}
