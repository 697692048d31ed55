use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::DeskError;
use crate::models::NewTask;
use crate::service::ReviewDesk;

#[derive(Debug, Deserialize)]
struct CsvRow {
    employee_id: Uuid,
    team_id: Option<Uuid>,
    title: String,
    description: String,
    github_repo_link: String,
    /// Separated by `;`, e.g. `react;nodejs`.
    tech_stacks: String,
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub submitted: Vec<Uuid>,
    /// CSV line number and why the row was skipped.
    pub skipped: Vec<(u64, String)>,
}

/// Submits one task per CSV row. Rows that fail to parse or validate are
/// reported and skipped; storage failures abort the import.
pub async fn import_csv(desk: &ReviewDesk, csv_path: &Path) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Line 1 is the header.
        let line = index as u64 + 2;
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!(line, error = %err, "unreadable csv row");
                summary.skipped.push((line, err.to_string()));
                continue;
            }
        };

        let team_id = match row.team_id {
            Some(team_id) => team_id,
            None => match desk.get_employee(row.employee_id).await?.and_then(|u| u.team_id) {
                Some(team_id) => team_id,
                None => {
                    summary
                        .skipped
                        .push((line, format!("employee {} has no team", row.employee_id)));
                    continue;
                }
            },
        };

        let input = NewTask {
            employee_id: row.employee_id,
            title: row.title,
            description: row.description,
            github_repo_link: row.github_repo_link,
            tech_stacks: row.tech_stacks.split(';').map(str::to_string).collect(),
            team_id,
        };

        match desk.submit_task(input).await {
            Ok(task) => summary.submitted.push(task.id),
            Err(err @ (DeskError::Validation(_) | DeskError::NotFound { .. })) => {
                warn!(line, error = %err, "csv row rejected");
                summary.skipped.push((line, err.to_string()));
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(summary)
}
