mod findings_table;
mod junit_report;

use std::path::Path;

use thiserror::Error;

use crate::domain::scangate::{gate_verdict::GateVerdict, ignore_policy::IgnorePolicy};

pub use findings_table::{ConsoleReport, FindingsTable};
pub use junit_report::{JUNIT_SUITE_NAME, JunitReport, JunitReportFile};

/// Destination of the verdict of a gate run.
pub trait ReportSink {
    fn publish(&self, verdict: &GateVerdict, policy: &IgnorePolicy) -> Result<(), ReportError>;
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("unable to write the {report} report: {source}")]
    Io {
        report: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to render the {report} report: {source}")]
    Render {
        report: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// The console table is always printed, the JUnit file only when a path is configured.
pub fn report_sinks_for(
    junit_report_path: Option<&Path>,
) -> Vec<Box<dyn ReportSink + Send + Sync>> {
    let mut sinks: Vec<Box<dyn ReportSink + Send + Sync>> = vec![Box::new(ConsoleReport)];
    if let Some(path) = junit_report_path {
        sinks.push(Box::new(JunitReportFile::new(path)));
    }
    sinks
}
