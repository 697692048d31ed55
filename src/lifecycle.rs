//! Task state machine.
//!
//! ```text
//! pending-analysis --analysis--> under-review --review(decision)--> completed | rejected
//! ```
//!
//! Transitions only move forward. Terminal tasks accept no further events.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::InvalidStateTransition;
use crate::models::{Decision, NewTask, Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    AnalysisCompleted,
    Reviewed(Decision),
}

impl TaskEvent {
    fn name(self) -> &'static str {
        match self {
            TaskEvent::AnalysisCompleted => "analysis-completed",
            TaskEvent::Reviewed(Decision::Completed) => "review-completed",
            TaskEvent::Reviewed(Decision::Rejected) => "review-rejected",
        }
    }
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Rejected)
    }

    /// Next status for `event`, or `None` when the machine has no such edge.
    pub fn next(self, event: TaskEvent) -> Option<TaskStatus> {
        match (self, event) {
            (TaskStatus::PendingAnalysis, TaskEvent::AnalysisCompleted) => {
                Some(TaskStatus::UnderReview)
            }
            (TaskStatus::UnderReview, TaskEvent::Reviewed(Decision::Completed)) => {
                Some(TaskStatus::Completed)
            }
            (TaskStatus::UnderReview, TaskEvent::Reviewed(Decision::Rejected)) => {
                Some(TaskStatus::Rejected)
            }
            _ => None,
        }
    }
}

impl Task {
    /// Fresh task in `pending-analysis`. `tech_stacks` must already be
    /// validated.
    pub fn submitted(input: NewTask, tech_stacks: BTreeSet<String>, now: DateTime<Utc>) -> Task {
        Task {
            id: Uuid::new_v4(),
            employee_id: input.employee_id,
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            github_repo_link: input.github_repo_link.trim().to_string(),
            tech_stacks,
            status: TaskStatus::PendingAnalysis,
            submitted_at: now,
            updated_at: now,
            analysis_id: None,
            review_id: None,
            team_id: input.team_id,
        }
    }

    pub fn transition(
        &self,
        event: TaskEvent,
        now: DateTime<Utc>,
    ) -> Result<Task, InvalidStateTransition> {
        let status = self.status.next(event).ok_or(InvalidStateTransition {
            task_id: self.id,
            from: self.status,
            event: event.name(),
        })?;
        Ok(Task {
            status,
            updated_at: now,
            ..self.clone()
        })
    }

    pub fn record_analysis(
        &self,
        analysis_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Task, InvalidStateTransition> {
        let mut task = self.transition(TaskEvent::AnalysisCompleted, now)?;
        task.analysis_id = Some(analysis_id);
        Ok(task)
    }

    pub fn record_review(
        &self,
        review_id: Uuid,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<Task, InvalidStateTransition> {
        let mut task = self.transition(TaskEvent::Reviewed(decision), now)?;
        task.review_id = Some(review_id);
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_task() -> Task {
        let input = NewTask {
            employee_id: Uuid::new_v4(),
            title: " Inventory API ".to_string(),
            description: "REST endpoints".to_string(),
            github_repo_link: "https://github.com/avery/inventory".to_string(),
            tech_stacks: vec!["nodejs".to_string()],
            team_id: Uuid::new_v4(),
        };
        let stacks = BTreeSet::from(["nodejs".to_string()]);
        Task::submitted(input, stacks, Utc::now())
    }

    #[test]
    fn submitted_task_starts_unlinked() {
        let task = new_task();
        assert_eq!(task.status, TaskStatus::PendingAnalysis);
        assert_eq!(task.title, "Inventory API");
        assert!(task.analysis_id.is_none());
        assert!(task.review_id.is_none());
        assert_eq!(task.submitted_at, task.updated_at);
    }

    #[test]
    fn happy_path_moves_forward_and_links_ids() {
        let task = new_task();
        let later = task.submitted_at + Duration::minutes(5);
        let analysis_id = Uuid::new_v4();
        let analyzed = task.record_analysis(analysis_id, later).unwrap();
        assert_eq!(analyzed.status, TaskStatus::UnderReview);
        assert_eq!(analyzed.analysis_id, Some(analysis_id));
        assert_eq!(analyzed.updated_at, later);

        let review_id = Uuid::new_v4();
        let reviewed = analyzed
            .record_review(review_id, Decision::Rejected, later)
            .unwrap();
        assert_eq!(reviewed.status, TaskStatus::Rejected);
        assert_eq!(reviewed.review_id, Some(review_id));
        assert!(reviewed.status.is_terminal());
    }

    #[test]
    fn review_before_analysis_is_rejected() {
        let task = new_task();
        let err = task
            .record_review(Uuid::new_v4(), Decision::Completed, Utc::now())
            .unwrap_err();
        assert_eq!(err.from, TaskStatus::PendingAnalysis);
        assert_eq!(err.task_id, task.id);
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for status in [TaskStatus::Completed, TaskStatus::Rejected] {
            assert!(status.next(TaskEvent::AnalysisCompleted).is_none());
            assert!(status.next(TaskEvent::Reviewed(Decision::Completed)).is_none());
            assert!(status.next(TaskEvent::Reviewed(Decision::Rejected)).is_none());
        }
    }

    #[test]
    fn analysis_cannot_run_twice() {
        let task = new_task()
            .record_analysis(Uuid::new_v4(), Utc::now())
            .unwrap();
        assert!(task.record_analysis(Uuid::new_v4(), Utc::now()).is_err());
    }
}
