use std::path::Path;

use research_logging::{research_info, task_tag};

use crate::filename::report_filename;
use crate::persist::AtomicFileWriter;
use crate::{ExportedReport, ReportRequest, ServiceError, TaskService};

/// Exports a report and, when `report_dir` is set, downloads a local copy.
pub async fn export_and_save(
    service: &dyn TaskService,
    report: &ReportRequest,
    report_dir: Option<&Path>,
) -> Result<ExportedReport, ServiceError> {
    let url = service.export_report(report).await?;
    research_info!(
        "Report ready task={} url={}",
        task_tag(&report.task_id),
        url
    );

    let saved_path = match report_dir {
        Some(dir) => {
            let bytes = service.download_report(&url).await?;
            let writer = AtomicFileWriter::new(dir.to_path_buf());
            let path = writer.write(&report_filename(&url), &bytes)?;
            research_info!("Report saved to {:?} ({} bytes)", path, bytes.len());
            Some(path)
        }
        None => None,
    };

    Ok(ExportedReport { url, saved_path })
}
