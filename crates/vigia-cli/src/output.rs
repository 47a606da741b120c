//! Progress and tally output on stderr
//!
//! Per-scenario summary lines go to stdout through [`vigia::Reporter`]; this
//! module owns the spinner and the final tally.

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use vigia::SuiteReport;

/// Progress reporter for a run
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Show a spinner while scenarios run
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Remove the spinner
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print the run tally
    pub fn summary(&self, report: &SuiteReport, duration: Duration) {
        let _ = self.term.write_line(&self.tally(report, duration));
    }

    fn tally(&self, report: &SuiteReport, duration: Duration) -> String {
        let secs = duration.as_secs_f64();
        let body = format!("{} in {secs:.2}s", report.summary());
        if !self.use_color {
            let status = if report.all_passed() { "PASSED" } else { "FAILED" };
            return format!("{status} {body}");
        }
        let status = if report.all_passed() {
            Style::new().green().bold().apply_to("PASSED")
        } else {
            Style::new().red().bold().apply_to("FAILED")
        };
        format!("{status} {body}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use vigia::{Reporter, VerdictRecorder};

    fn report(passing: bool) -> SuiteReport {
        let mut recorder = VerdictRecorder::new("uno", 1);
        if !passing {
            let error = vigia::HarnessError::assertion("texto distinto");
            recorder.fail(
                vigia::VerdictStatus::for_error(&error),
                vigia::Failure::from_error(None, None, &error),
            );
        }
        let mut reporter = Reporter::new(Vec::new());
        SuiteReport::new(vec![reporter.finalize(recorder.finish(Vec::new()))])
    }

    #[test]
    fn test_plain_tally() {
        let reporter = ProgressReporter::new(false, false);
        assert_eq!(
            reporter.tally(&report(true), Duration::from_millis(1500)),
            "PASSED 1 scenario(s): 1 passed, 0 failed, 0 errored in 1.50s"
        );
        assert!(reporter
            .tally(&report(false), Duration::ZERO)
            .starts_with("FAILED 1 scenario(s): 0 passed, 1 failed"));
    }

    #[test]
    fn test_quiet_has_no_spinner() {
        let mut reporter = ProgressReporter::new(false, true);
        reporter.start_spinner("running");
        assert!(reporter.spinner.is_none());
        reporter.finish();
    }
}
