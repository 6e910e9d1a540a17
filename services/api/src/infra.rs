use academy::classroom::StudentDirectory;
use academy::error::AppError;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Load the student directory, falling back to an empty one when no export is configured.
pub(crate) fn load_directory(path: Option<&Path>) -> Result<StudentDirectory, AppError> {
    match path {
        Some(path) => {
            let directory = StudentDirectory::from_path(path)?;
            info!(
                path = %path.display(),
                batches = directory.batch_ids().len(),
                students = directory.student_count(),
                "student directory loaded"
            );
            Ok(directory)
        }
        None => {
            warn!("no student directory configured; batch membership checks will fail");
            Ok(StudentDirectory::new())
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
