use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use syllabus_core::{ProgressEvent, RunOutcome, WorkUnit};
use tokio::{sync::mpsc, task::JoinHandle};

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Print every status above the spinner and keep the latest one as its
/// message. Stops at the terminal result or when the sink is dropped.
pub fn render_progress(
    mut events: mpsc::UnboundedReceiver<ProgressEvent>,
    spinner: ProgressBar,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ProgressEvent::Status { msg } => {
                    spinner.println(format!("  {} {}", style("·").dim(), msg));
                    spinner.set_message(msg);
                }
                ProgressEvent::Result { .. } => break,
            }
        }
    })
}

fn describe_unit(unit: &WorkUnit) -> String {
    match unit {
        WorkUnit::Summary { video } => format!("summary of {video}"),
        WorkUnit::Plan => "module plan".to_string(),
        WorkUnit::Direct => "single-pass generation".to_string(),
        WorkUnit::Persona => "persona detection".to_string(),
        WorkUnit::Chunk { module, chunk } => format!("module {} chunk {}", module + 1, chunk + 1),
        WorkUnit::Module { module } => format!("module {}", module + 1),
        WorkUnit::MissingVideo { module, video } => {
            format!("module {} source {video}", module + 1)
        }
        WorkUnit::Consolidation { module } => format!("module {} consolidation", module + 1),
        WorkUnit::LessonEnrichment { module, lesson } => {
            format!("module {} lesson {} enrichment", module + 1, lesson + 1)
        }
    }
}

pub fn print_outcome(outcome: &RunOutcome, elapsed: Duration) {
    let strategy = outcome
        .strategy
        .map(|s| format!(" via {}", s.name()))
        .unwrap_or_default();
    println!(
        "{} Curriculum {}{}: {} modules, {} lessons {}",
        style("✓").green().bold(),
        style(&outcome.curriculum_id).cyan(),
        strategy,
        outcome.modules,
        outcome.lessons,
        style(format!("[{}]", format_duration(elapsed))).dim()
    );

    if outcome.report.is_clean() {
        return;
    }
    println!(
        "{} {} units degraded (run `syllabus repair` to retry):",
        style("!").yellow().bold(),
        outcome.report.failures.len()
    );
    for failure in &outcome.report.failures {
        println!(
            "    {} {}",
            style(describe_unit(&failure.unit)).yellow(),
            style(&failure.message).dim()
        );
    }
}
