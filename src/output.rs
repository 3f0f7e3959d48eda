//! Console output outside the log stream.
//!
//! Fatal start-up errors happen before logging exists, and the `--once`
//! summary is meant for a human at a terminal; both go through here.

use crate::scanner::ScanReport;
use colored::*;

/// Styled console output.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints an error message in red with an X mark to stderr.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mvgo::output::OutputFormatter;
    /// OutputFormatter::error("Error loading config: file not found");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a table of the outcomes of one scan.
    pub fn scan_summary(report: &ScanReport) {
        Self::header("SCAN SUMMARY");

        let rows = Self::summary_rows(report);
        let width = rows
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0)
            .max("Outcome".len());

        println!(
            "{:<width$} | {}",
            "Outcome".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (label, count) in &rows {
            let count = if *count == 0 {
                count.to_string().normal()
            } else if *label == "Failed" {
                count.to_string().red()
            } else {
                count.to_string().green()
            };
            println!("{:<width$} | {}", label, count, width = width);
        }

        println!("{}", "-".repeat(width + 10));
        let total = report.files_seen();
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            if total == 1 { "file" } else { "files" },
            width = width
        );
    }

    fn summary_rows(report: &ScanReport) -> Vec<(&'static str, usize)> {
        vec![
            ("Moved", report.moved),
            ("Duplicates relocated", report.duplicates_relocated),
            ("Duplicates left", report.duplicates_left),
            ("Unmatched", report.unmatched),
            ("Failed", report.failed),
            ("Unreadable entries", report.skipped_entries),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_rows_follow_report() {
        let report = ScanReport {
            moved: 3,
            failed: 1,
            ..Default::default()
        };
        let rows = OutputFormatter::summary_rows(&report);

        assert_eq!(rows[0], ("Moved", 3));
        assert_eq!(rows[4], ("Failed", 1));
        assert_eq!(rows.iter().map(|(_, n)| n).sum::<usize>(), 4);
    }
}
