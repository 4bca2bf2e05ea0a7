//! Output formatting and progress reporting

use crate::config::Verbosity;
use crate::error::CliResult;
use console::{style, Style, Term};
use flowprobe::{
    RunListener, RunReport, Scenario, ScenarioPlan, ScenarioResult, Session, StepFailure,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt::Write as _;

/// Console reporter for a run; also receives engine events
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Verbosity level
    pub verbosity: Verbosity,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, Verbosity::Normal)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, verbosity: Verbosity) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            verbosity,
        }
    }

    /// Start a progress bar over the scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.verbosity.is_quiet() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn line(&self, text: &str) {
        match self.progress_bar {
            Some(ref pb) => pb.suspend(|| {
                let _ = self.term.write_line(text);
            }),
            None => {
                let _ = self.term.write_line(text);
            }
        }
    }

    fn marker(&self, glyph: &str, plain: &str, paint: fn(&str) -> String) -> String {
        if self.use_color {
            paint(glyph)
        } else {
            plain.to_string()
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.verbosity.is_quiet() {
            return;
        }
        let prefix = self.marker("✓", "PASS", |g| style(g).green().bold().to_string());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = self.marker("✗", "FAIL", |g| style(g).red().bold().to_string());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity.is_quiet() {
            return;
        }
        let prefix = self.marker("⚠", "WARN", |g| style(g).yellow().bold().to_string());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.verbosity.is_quiet() {
            return;
        }
        let prefix = self.marker("ℹ", "INFO", |g| style(g).blue().bold().to_string());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.verbosity.is_quiet() {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        self.line("");
        self.line(&styled);
    }

    /// Print one line per scenario and the run totals
    pub fn summary(&self, report: &RunReport) {
        self.finish();
        let failed = report.failed();
        if self.verbosity.is_quiet() && failed == 0 {
            return;
        }

        self.header("Summary");
        for scenario in &report.scenarios {
            let line = scenario_line(scenario);
            if scenario.passed() {
                self.success(&line);
            } else {
                self.failure(&line);
            }
        }

        let _ = self.term.write_line("");
        let passed = report.passed();
        let skipped = report.skipped();
        let total = report.scenarios.len();
        let duration_secs = report.duration_ms as f64 / 1000.0;

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };

            let _ = self.term.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed, {} skipped sub-features)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                skipped_style.apply_to(skipped)
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped sub-features)"
            ));
        }
    }
}

fn scenario_line(result: &ScenarioResult) -> String {
    let mut line = format!("{} ({} ms)", result.name, result.duration_ms);
    if !result.skipped.is_empty() {
        let _ = write!(line, ", {} skipped", result.skipped.len());
    }
    if let Some(ref failure) = result.failure {
        let _ = write!(line, ": {} failed", failure.step);
    }
    line
}

fn failure_detail(failure: &StepFailure) -> String {
    let mut detail = format!("{}: {}", failure.step, failure.reason);
    if let Some(path) = failure
        .diagnostic
        .as_ref()
        .and_then(|d| d.screenshot_path.as_ref())
    {
        let _ = write!(detail, " [screenshot {}]", path.display());
    }
    detail
}

impl RunListener for ProgressReporter {
    fn run_started(&mut self, plan: &ScenarioPlan, session: &Session) {
        self.header(&format!("Hypertrio flows ({} scenarios)", plan.len()));
        self.info(&format!("session account {}", session.email()));
        self.start_progress(plan.len() as u64, "starting");
    }

    fn scenario_started(&mut self, scenario: &Scenario) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(scenario.name().to_string());
        }
        if self.verbosity.is_verbose() {
            self.info(&format!("{} started", scenario.name()));
        }
    }

    fn step_passed(&mut self, step: &str) {
        if self.verbosity.is_verbose() {
            self.success(step);
        }
    }

    fn soft_failure(&mut self, failure: &StepFailure) {
        self.warning(&format!("skipped {}", failure_detail(failure)));
    }

    fn hard_failure(&mut self, scenario: &str, failure: &StepFailure) {
        self.failure(&format!("{scenario}: {}", failure_detail(failure)));
    }

    fn scenario_finished(&mut self, result: &ScenarioResult) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
        if result.passed() {
            self.success(&format!("{} passed", result.name));
        } else {
            self.failure(&format!("{} failed", result.name));
        }
    }
}

#[derive(Debug, Serialize)]
struct PlanEntry<'a> {
    order: u32,
    name: &'a str,
    requires: &'a [String],
    steps: usize,
}

fn plan_entries(plan: &ScenarioPlan) -> Vec<PlanEntry<'_>> {
    plan.scenarios()
        .iter()
        .map(|s| PlanEntry {
            order: s.order(),
            name: s.name(),
            requires: s.requirements(),
            steps: s.step_list().len(),
        })
        .collect()
}

/// One line per scenario in run order
#[must_use]
pub fn render_plan(plan: &ScenarioPlan) -> String {
    let mut out = String::new();
    for entry in plan_entries(plan) {
        let _ = write!(
            out,
            "{:>2}. {:<28} {:>3} steps",
            entry.order, entry.name, entry.steps
        );
        if !entry.requires.is_empty() {
            let _ = write!(out, "  requires {}", entry.requires.join(", "));
        }
        out.push('\n');
    }
    out
}

/// The plan as a JSON array
pub fn render_plan_json(plan: &ScenarioPlan) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(&plan_entries(plan))?)
}
