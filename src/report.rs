use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Review, Task, User};
use crate::queries::{LeaderboardEntry, SkillMatrix, TaskStats, TopMemberPerTechStack};
use crate::scoring::round_one_decimal;
use crate::tech;

/// Everything the report renders, gathered up front so rendering stays pure.
pub struct ReportInput<'a> {
    pub generated_at: DateTime<Utc>,
    pub stats: TaskStats,
    pub leaderboard: &'a [LeaderboardEntry],
    pub top_members: &'a [TopMemberPerTechStack],
    pub matrix: &'a SkillMatrix,
    pub reviews: &'a [Review],
    pub tasks: &'a [Task],
    pub users: &'a [User],
}

pub fn build_report(input: &ReportInput<'_>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Task Review Report");
    let _ = writeln!(
        output,
        "Generated {}",
        input.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Task Status");
    let _ = writeln!(output, "- Total: {}", input.stats.total);
    let _ = writeln!(output, "- Awaiting review: {}", input.stats.awaiting);
    let _ = writeln!(output, "- Completed: {}", input.stats.completed);
    let _ = writeln!(output, "- Rejected: {}", input.stats.rejected);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performers");

    if input.leaderboard.is_empty() {
        let _ = writeln!(output, "No scored reviews yet.");
    } else {
        for (rank, entry) in input.leaderboard.iter().take(5).enumerate() {
            let _ = writeln!(
                output,
                "{}. {} avg {:.1} ({} completed, {} rejected)",
                rank + 1,
                entry.name,
                round_one_decimal(entry.overall_average),
                entry.total_tasks_completed,
                entry.total_tasks_rejected
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Members by Tech Stack");

    if input.top_members.is_empty() {
        let _ = writeln!(output, "No technology has been scored yet.");
    } else {
        for stack in input.top_members {
            let members: Vec<String> = stack
                .top_members
                .iter()
                .map(|m| format!("{} ({:.1})", m.name, round_one_decimal(m.average)))
                .collect();
            let _ = writeln!(
                output,
                "- {}: {}",
                tech::label(&stack.tech_stack),
                members.join(", ")
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Skill Matrix");

    if input.matrix.rows.is_empty() {
        let _ = writeln!(output, "No scored employees yet.");
    } else {
        let headers: Vec<&str> = input
            .matrix
            .technologies
            .iter()
            .map(|t| tech::label(t))
            .collect();
        let _ = writeln!(output, "| Employee | {} | Overall |", headers.join(" | "));
        let _ = writeln!(
            output,
            "|---|{}---|",
            "---|".repeat(input.matrix.technologies.len())
        );
        for row in &input.matrix.rows {
            let cells: Vec<String> = input
                .matrix
                .technologies
                .iter()
                .map(|t| {
                    row.scores
                        .get(t)
                        .map(|avg| format!("{:.1}", round_one_decimal(*avg)))
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect();
            let _ = writeln!(
                output,
                "| {} | {} | {:.1} |",
                row.name,
                cells.join(" | "),
                round_one_decimal(row.overall)
            );
        }
    }

    let names: HashMap<Uuid, &str> = input
        .users
        .iter()
        .map(|user| (user.id, user.name.as_str()))
        .collect();
    let tasks: HashMap<Uuid, &Task> = input.tasks.iter().map(|task| (task.id, task)).collect();

    let mut recent: Vec<&Review> = input.reviews.iter().collect();
    recent.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Feedback");

    if recent.is_empty() {
        let _ = writeln!(output, "No reviews recorded.");
    } else {
        for review in recent.iter().take(5) {
            let task = tasks.get(&review.task_id);
            let title = task.map_or("unknown task", |t| t.title.as_str());
            let employee = task
                .and_then(|t| names.get(&t.employee_id))
                .copied()
                .unwrap_or("Unknown");
            let reviewer = names.get(&review.admin_id).copied().unwrap_or("Unknown");
            let _ = writeln!(
                output,
                "- {} / {} ({}, by {} on {}): {}",
                employee,
                title,
                review.decision.as_str(),
                reviewer,
                review.reviewed_at.format("%Y-%m-%d"),
                review.feedback
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::models::{Decision, EmployeeScore, Role, TaskStatus};
    use crate::queries;

    fn user(n: u128, name: &str, role: Role) -> User {
        User {
            id: Uuid::from_u128(n),
            name: name.to_string(),
            email: format!("{n}@example.com"),
            role,
            team_id: None,
            designation: String::new(),
        }
    }

    #[test]
    fn empty_report_has_placeholders() {
        let matrix = queries::skill_matrix(&[], &[]);
        let report = build_report(&ReportInput {
            generated_at: Utc::now(),
            stats: TaskStats::default(),
            leaderboard: &[],
            top_members: &[],
            matrix: &matrix,
            reviews: &[],
            tasks: &[],
            users: &[],
        });
        assert!(report.contains("# Task Review Report"));
        assert!(report.contains("No scored reviews yet."));
        assert!(report.contains("No reviews recorded."));
    }

    #[test]
    fn report_renders_scores_and_feedback() {
        let users = vec![
            user(1, "Avery Lee", Role::Employee),
            user(2, "Priya Sharma", Role::Admin),
        ];
        let mut score = EmployeeScore::empty(Uuid::from_u128(1));
        let given = BTreeMap::from([("react".to_string(), 9), ("nodejs".to_string(), 6)]);
        score.apply_review(&given, Decision::Completed);
        let scores = vec![score];

        let task = Task {
            id: Uuid::from_u128(10),
            employee_id: Uuid::from_u128(1),
            title: "Inventory dashboard".to_string(),
            description: "d".to_string(),
            github_repo_link: "https://github.com/avery/inventory".to_string(),
            tech_stacks: BTreeSet::from(["react".to_string(), "nodejs".to_string()]),
            status: TaskStatus::Completed,
            submitted_at: Utc::now(),
            updated_at: Utc::now(),
            analysis_id: None,
            review_id: Some(Uuid::from_u128(20)),
            team_id: Uuid::from_u128(30),
        };
        let review = Review {
            id: Uuid::from_u128(20),
            task_id: task.id,
            admin_id: Uuid::from_u128(2),
            feedback: "Great component structure".to_string(),
            scores: given,
            decision: Decision::Completed,
            reviewed_at: Utc::now(),
        };

        let leaderboard = queries::leaderboard(&users, &scores, None);
        let top = queries::top_members_per_tech_stack(&users, &scores, 5);
        let matrix = queries::skill_matrix(&users, &scores);
        let tasks = vec![task];
        let report = build_report(&ReportInput {
            generated_at: Utc::now(),
            stats: queries::task_stats(&tasks),
            leaderboard: &leaderboard,
            top_members: &top,
            matrix: &matrix,
            reviews: &[review],
            tasks: &tasks,
            users: &users,
        });

        assert!(report.contains("1. Avery Lee avg 7.5 (1 completed, 0 rejected)"));
        assert!(report.contains("- React: Avery Lee (9.0)"));
        assert!(report.contains("| Employee | Node.js | React | Overall |"));
        assert!(report.contains("| Avery Lee | 6.0 | 9.0 | 7.5 |"));
        assert!(report.contains(
            "- Avery Lee / Inventory dashboard (completed, by Priya Sharma on"
        ));
    }
}
