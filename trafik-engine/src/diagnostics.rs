//! Diagnostic report capture for failed replay validations.

use std::fs::File;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

/// Writes diagnostic reports for operator follow-up.
///
/// Reports land in the working directory as `bug_report_<ts>.yaml`.
#[derive(Debug, Default)]
pub struct DiagnosticsCollector {
    reports_written: u64,
}

impl DiagnosticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persists a report and returns its filename.
    pub fn record_bug_report(&mut self, report: &str) -> std::io::Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_secs();
        let filename = format!("bug_report_{timestamp}.yaml");
        let mut file = File::create(&filename)?;
        file.write_all(report.as_bytes())?;
        self.reports_written += 1;
        Ok(filename)
    }

    pub fn reports_written(&self) -> u64 {
        self.reports_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_reports_to_disk() {
        let mut collector = DiagnosticsCollector::new();
        let filename = collector.record_bug_report("replay mismatch\n").unwrap();
        let contents = std::fs::read_to_string(&filename).unwrap();
        assert!(contents.contains("replay mismatch"));
        assert_eq!(collector.reports_written(), 1);
        std::fs::remove_file(filename).unwrap();
    }
}
