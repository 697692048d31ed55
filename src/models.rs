use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Role::Admin),
            "employee" => Ok(Role::Employee),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub team_id: Option<Uuid>,
    pub designation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub lead_id: Uuid,
    pub member_ids: BTreeSet<Uuid>,
    pub project: String,
    pub description: String,
}

/// Where a task sits in the review pipeline. Transitions live in
/// [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    PendingAnalysis,
    UnderReview,
    Completed,
    Rejected,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::PendingAnalysis => "pending-analysis",
            TaskStatus::UnderReview => "under-review",
            TaskStatus::Completed => "completed",
            TaskStatus::Rejected => "rejected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::PendingAnalysis => "Pending Analysis",
            TaskStatus::UnderReview => "Under Review",
            TaskStatus::Completed => "Completed",
            TaskStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending-analysis" => Ok(TaskStatus::PendingAnalysis),
            "under-review" => Ok(TaskStatus::UnderReview),
            "completed" => Ok(TaskStatus::Completed),
            "rejected" => Ok(TaskStatus::Rejected),
            other => Err(ParseEnumError::new("task status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub title: String,
    pub description: String,
    pub github_repo_link: String,
    pub tech_stacks: BTreeSet<String>,
    pub status: TaskStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub analysis_id: Option<Uuid>,
    pub review_id: Option<Uuid>,
    pub team_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: u8,
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisCategories {
    pub code_quality: CategoryScore,
    pub security: CategoryScore,
    pub performance: CategoryScore,
    pub best_practices: CategoryScore,
    pub documentation: CategoryScore,
}

impl AnalysisCategories {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &CategoryScore)> {
        [
            ("codeQuality", &self.code_quality),
            ("security", &self.security),
            ("performance", &self.performance),
            ("bestPractices", &self.best_practices),
            ("documentation", &self.documentation),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: Uuid,
    pub task_id: Uuid,
    pub repo_link: String,
    pub analyzed_at: DateTime<Utc>,
    pub overall_score: u8,
    pub summary: String,
    pub categories: AnalysisCategories,
    pub suggestions: Vec<Suggestion>,
    pub files_analyzed: u32,
    pub lines_of_code: u32,
    pub languages: BTreeMap<String, u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Completed,
    Rejected,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Completed => "completed",
            Decision::Rejected => "rejected",
        }
    }
}

impl FromStr for Decision {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "completed" => Ok(Decision::Completed),
            "rejected" => Ok(Decision::Rejected),
            other => Err(ParseEnumError::new("decision", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub task_id: Uuid,
    pub admin_id: Uuid,
    pub feedback: String,
    pub scores: BTreeMap<String, u8>,
    pub decision: Decision,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TechStackScore {
    pub total: u32,
    pub count: u32,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeScore {
    pub employee_id: Uuid,
    pub scores: BTreeMap<String, TechStackScore>,
    pub overall_average: f64,
    pub total_tasks_completed: u32,
    pub total_tasks_rejected: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub employee_id: Uuid,
    pub title: String,
    pub description: String,
    pub github_repo_link: String,
    pub tech_stacks: Vec<String>,
    pub team_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub task_id: Uuid,
    pub admin_id: Uuid,
    pub feedback: String,
    /// Raw reviewer input; range is checked before anything is stored.
    pub scores: BTreeMap<String, i64>,
    pub decision: Decision,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub team_id: Option<Uuid>,
    pub designation: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeam {
    pub name: String,
    pub lead_id: Option<Uuid>,
    pub member_ids: Vec<Uuid>,
    pub project: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub employee_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |status| task.status == status)
            && self.employee_id.map_or(true, |id| task.employee_id == id)
            && self.team_id.map_or(true, |id| task.team_id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in [
            TaskStatus::PendingAnalysis,
            TaskStatus::UnderReview,
            TaskStatus::Completed,
            TaskStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!("archived".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn filter_combines_all_set_fields() {
        let employee_id = Uuid::new_v4();
        let team_id = Uuid::new_v4();
        let task = Task {
            id: Uuid::new_v4(),
            employee_id,
            title: "Inventory API".to_string(),
            description: "CRUD endpoints".to_string(),
            github_repo_link: "https://github.com/avery/inventory".to_string(),
            tech_stacks: BTreeSet::from(["nodejs".to_string()]),
            status: TaskStatus::UnderReview,
            submitted_at: Utc::now(),
            updated_at: Utc::now(),
            analysis_id: None,
            review_id: None,
            team_id,
        };

        assert!(TaskFilter::default().matches(&task));
        assert!(TaskFilter {
            status: Some(TaskStatus::UnderReview),
            employee_id: Some(employee_id),
            team_id: Some(team_id),
        }
        .matches(&task));
        assert!(!TaskFilter {
            status: Some(TaskStatus::Completed),
            ..TaskFilter::default()
        }
        .matches(&task));
        assert!(!TaskFilter {
            team_id: Some(Uuid::new_v4()),
            ..TaskFilter::default()
        }
        .matches(&task));
    }

    #[test]
    fn task_serializes_with_camel_case_fields() {
        let now = Utc::now();
        let task = Task {
            id: Uuid::nil(),
            employee_id: Uuid::nil(),
            title: "t".to_string(),
            description: "d".to_string(),
            github_repo_link: "https://github.com/a/b".to_string(),
            tech_stacks: BTreeSet::from(["react".to_string()]),
            status: TaskStatus::PendingAnalysis,
            submitted_at: now,
            updated_at: now,
            analysis_id: None,
            review_id: None,
            team_id: Uuid::nil(),
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["githubRepoLink"], "https://github.com/a/b");
        assert_eq!(value["status"], "pending-analysis");
        assert!(value["analysisId"].is_null());
    }
}
