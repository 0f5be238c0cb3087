//! Report output port.

use std::fs;
use std::path::Path;

use crate::domain::error::DcaBenchError;
use crate::domain::metrics::StrategyResult;
use crate::domain::strategy::StrategySpec;

/// Port for writing a finished run in some export format.
pub trait ReportPort {
    fn render(&self, result: &StrategyResult, spec: &StrategySpec) -> Result<String, DcaBenchError>;

    /// Render, then write to `output_path`, creating parent directories.
    fn write(
        &self,
        result: &StrategyResult,
        spec: &StrategySpec,
        output_path: &Path,
    ) -> Result<(), DcaBenchError> {
        let content = self.render(result, spec)?;
        let io_err = |e: std::io::Error| DcaBenchError::Report {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        };
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(output_path, content).map_err(io_err)
    }
}
