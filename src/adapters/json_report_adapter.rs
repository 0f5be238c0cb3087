//! JSON report adapter.
//!
//! Emits the result with chart-ready series (`{time, value}` points and
//! `{time, price}` buy markers) plus the strategy selector and parameters.

use serde::Serialize;

use crate::domain::error::DcaBenchError;
use crate::domain::metrics::StrategyResult;
use crate::domain::strategy::StrategySpec;
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
struct JsonReport<'a> {
    strategy: &'static str,
    parameters: &'a StrategySpec,
    #[serde(flatten)]
    result: &'a StrategyResult,
}

#[derive(Default)]
pub struct JsonReportAdapter {
    pretty: bool,
}

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl ReportPort for JsonReportAdapter {
    fn render(&self, result: &StrategyResult, spec: &StrategySpec) -> Result<String, DcaBenchError> {
        let report = JsonReport {
            strategy: spec.kind().selector(),
            parameters: spec,
            result,
        };
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        };
        rendered.map_err(|e| DcaBenchError::Report {
            reason: format!("JSON serialization failed: {}", e),
        })
    }
}
