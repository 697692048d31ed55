//! Read-only views derived from users, tasks and score aggregates.
//!
//! Everything here is recomputed per call. Sort ties break on employee id
//! so repeated reads return identical orderings.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use uuid::Uuid;

use crate::models::{EmployeeScore, Task, TaskStatus, Team, User};

pub const UNKNOWN_EMPLOYEE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopMember {
    pub employee_id: Uuid,
    pub name: String,
    pub average: f64,
    pub total_tasks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopMemberPerTechStack {
    pub tech_stack: String,
    pub top_members: Vec<TopMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub employee_id: Uuid,
    pub name: String,
    pub overall_average: f64,
    pub total_tasks_completed: u32,
    pub total_tasks_rejected: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMatrixRow {
    pub employee_id: Uuid,
    pub name: String,
    pub scores: BTreeMap<String, f64>,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMatrix {
    /// Column order: every technology scored for at least one row.
    pub technologies: Vec<String>,
    pub rows: Vec<SkillMatrixRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    /// Pending analysis plus under review.
    pub awaiting: usize,
    pub completed: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSkills {
    pub employee_id: Uuid,
    pub name: String,
    pub top_skills: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub team_id: Uuid,
    pub name: String,
    pub project: String,
    pub lead_name: String,
    pub task_count: usize,
    pub completed_count: usize,
    pub members: Vec<MemberSkills>,
}

fn names(users: &[User]) -> HashMap<Uuid, &str> {
    users.iter().map(|user| (user.id, user.name.as_str())).collect()
}

fn by_value_desc_then_id(a: (f64, Uuid), b: (f64, Uuid)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1))
}

/// Best `limit` employees per technology. Technologies with more listed
/// members come first, ties by technology name.
pub fn top_members_per_tech_stack(
    users: &[User],
    scores: &[EmployeeScore],
    limit: usize,
) -> Vec<TopMemberPerTechStack> {
    let names = names(users);
    let mut by_tech: BTreeMap<&str, Vec<TopMember>> = BTreeMap::new();

    for score in scores {
        // Aggregates for removed users are skipped rather than shown as unknown.
        let Some(name) = names.get(&score.employee_id) else {
            continue;
        };
        for (tech, data) in &score.scores {
            if data.count == 0 || data.average <= 0.0 {
                continue;
            }
            by_tech.entry(tech.as_str()).or_default().push(TopMember {
                employee_id: score.employee_id,
                name: name.to_string(),
                average: data.average,
                total_tasks: score.total_tasks_completed,
            });
        }
    }

    let mut result: Vec<TopMemberPerTechStack> = by_tech
        .into_iter()
        .map(|(tech, mut members)| {
            members.sort_by(|a, b| {
                by_value_desc_then_id((a.average, a.employee_id), (b.average, b.employee_id))
            });
            members.truncate(limit);
            TopMemberPerTechStack {
                tech_stack: tech.to_string(),
                top_members: members,
            }
        })
        .collect();

    result.sort_by(|a, b| {
        b.top_members
            .len()
            .cmp(&a.top_members.len())
            .then_with(|| a.tech_stack.cmp(&b.tech_stack))
    });
    result
}

/// Employees with a real overall score, best first.
pub fn leaderboard(
    users: &[User],
    scores: &[EmployeeScore],
    limit: Option<usize>,
) -> Vec<LeaderboardEntry> {
    let names = names(users);
    let mut entries: Vec<LeaderboardEntry> = scores
        .iter()
        .filter(|score| score.is_scored())
        .map(|score| LeaderboardEntry {
            employee_id: score.employee_id,
            name: names
                .get(&score.employee_id)
                .copied()
                .unwrap_or(UNKNOWN_EMPLOYEE)
                .to_string(),
            overall_average: score.overall_average,
            total_tasks_completed: score.total_tasks_completed,
            total_tasks_rejected: score.total_tasks_rejected,
        })
        .collect();

    entries.sort_by(|a, b| {
        by_value_desc_then_id(
            (a.overall_average, a.employee_id),
            (b.overall_average, b.employee_id),
        )
    });
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}

pub fn skill_matrix(users: &[User], scores: &[EmployeeScore]) -> SkillMatrix {
    let names = names(users);
    let mut technologies = BTreeSet::new();
    let mut rows: Vec<SkillMatrixRow> = scores
        .iter()
        .filter(|score| score.is_scored())
        .map(|score| {
            let cells: BTreeMap<String, f64> = score
                .scores
                .iter()
                .filter(|(_, data)| data.count > 0)
                .map(|(tech, data)| (tech.clone(), data.average))
                .collect();
            technologies.extend(cells.keys().cloned());
            SkillMatrixRow {
                employee_id: score.employee_id,
                name: names
                    .get(&score.employee_id)
                    .copied()
                    .unwrap_or(UNKNOWN_EMPLOYEE)
                    .to_string(),
                scores: cells,
                overall: score.overall_average,
            }
        })
        .collect();

    rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.employee_id.cmp(&b.employee_id)));

    SkillMatrix {
        technologies: technologies.into_iter().collect(),
        rows,
    }
}

pub fn task_stats(tasks: &[Task]) -> TaskStats {
    tasks.iter().fold(TaskStats::default(), |mut stats, task| {
        stats.total += 1;
        match task.status {
            TaskStatus::PendingAnalysis | TaskStatus::UnderReview => stats.awaiting += 1,
            TaskStatus::Completed => stats.completed += 1,
            TaskStatus::Rejected => stats.rejected += 1,
        }
        stats
    })
}

/// Newest first; equal timestamps fall back to id.
pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.submitted_at
            .cmp(&a.submitted_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub fn team_summaries(
    teams: &[Team],
    users: &[User],
    tasks: &[Task],
    scores: &[EmployeeScore],
    skills_per_member: usize,
) -> Vec<TeamSummary> {
    let names = names(users);
    let scores: HashMap<Uuid, &EmployeeScore> =
        scores.iter().map(|score| (score.employee_id, score)).collect();

    teams
        .iter()
        .map(|team| {
            let team_tasks = tasks.iter().filter(|task| task.team_id == team.id);
            let (task_count, completed_count) =
                team_tasks.fold((0, 0), |(total, done), task| {
                    (total + 1, done + usize::from(task.status == TaskStatus::Completed))
                });
            let members = team
                .member_ids
                .iter()
                .filter_map(|id| {
                    let name = names.get(id)?;
                    let top_skills = scores
                        .get(id)
                        .map(|score| {
                            score
                                .top_skills(skills_per_member)
                                .into_iter()
                                .map(|(tech, avg)| (tech.to_string(), avg))
                                .collect()
                        })
                        .unwrap_or_default();
                    Some(MemberSkills {
                        employee_id: *id,
                        name: name.to_string(),
                        top_skills,
                    })
                })
                .collect();

            TeamSummary {
                team_id: team.id,
                name: team.name.clone(),
                project: team.project.clone(),
                lead_name: names
                    .get(&team.lead_id)
                    .copied()
                    .unwrap_or(UNKNOWN_EMPLOYEE)
                    .to_string(),
                task_count,
                completed_count,
                members,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Decision, Role};
    use chrono::{Duration, Utc};

    fn user(n: u128, name: &str) -> User {
        User {
            id: Uuid::from_u128(n),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role: Role::Employee,
            team_id: None,
            designation: "Intern".to_string(),
        }
    }

    fn scored(n: u128, reviews: &[&[(&str, u8)]]) -> EmployeeScore {
        let mut score = EmployeeScore::empty(Uuid::from_u128(n));
        for review in reviews {
            let map = review.iter().map(|(t, s)| (t.to_string(), *s)).collect();
            score.apply_review(&map, Decision::Completed);
        }
        score
    }

    fn fixture() -> (Vec<User>, Vec<EmployeeScore>) {
        let users = vec![
            user(1, "Avery"),
            user(2, "Jules"),
            user(3, "Kiara"),
            user(4, "Noor"),
        ];
        let scores = vec![
            scored(1, &[&[("react", 9), ("nodejs", 7)]]),
            scored(2, &[&[("react", 6)]]),
            scored(3, &[&[("react", 9), ("sql", 5)]]),
            EmployeeScore::empty(Uuid::from_u128(4)),
        ];
        (users, scores)
    }

    #[test]
    fn top_members_sorted_with_id_tie_break() {
        let (users, scores) = fixture();
        let result = top_members_per_tech_stack(&users, &scores, 5);

        let techs: Vec<&str> = result.iter().map(|r| r.tech_stack.as_str()).collect();
        assert_eq!(techs, vec!["react", "nodejs", "sql"]);

        let react: Vec<&str> = result[0].top_members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(react, vec!["Avery", "Kiara", "Jules"]);
        assert_eq!(result[0].top_members[0].total_tasks, 1);
    }

    #[test]
    fn top_members_truncates_per_stack() {
        let users: Vec<User> = (1..=7).map(|n| user(n, &format!("E{n}"))).collect();
        let scores: Vec<EmployeeScore> = (1..=7)
            .map(|n| scored(n, &[&[("docker", n as u8)]]))
            .collect();
        let result = top_members_per_tech_stack(&users, &scores, 5);
        assert_eq!(result.len(), 1);
        let averages: Vec<f64> = result[0].top_members.iter().map(|m| m.average).collect();
        assert_eq!(averages, vec![7.0, 6.0, 5.0, 4.0, 3.0]);
    }

    #[test]
    fn top_members_is_stable_across_calls() {
        let (users, scores) = fixture();
        assert_eq!(
            top_members_per_tech_stack(&users, &scores, 5),
            top_members_per_tech_stack(&users, &scores, 5)
        );
    }

    #[test]
    fn leaderboard_skips_unscored_employees() {
        let (users, scores) = fixture();
        let board = leaderboard(&users, &scores, None);
        let names: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Avery", "Kiara", "Jules"]);
        assert!(board.iter().all(|e| e.overall_average > 0.0));

        assert_eq!(leaderboard(&users, &scores, Some(1)).len(), 1);
    }

    #[test]
    fn matrix_only_has_scored_cells() {
        let (users, scores) = fixture();
        let matrix = skill_matrix(&users, &scores);
        assert_eq!(matrix.technologies, vec!["nodejs", "react", "sql"]);
        assert_eq!(matrix.rows.len(), 3);
        let jules = matrix.rows.iter().find(|r| r.name == "Jules").unwrap();
        assert_eq!(jules.scores.len(), 1);
        assert_eq!(jules.overall, 6.0);
    }

    #[test]
    fn stats_and_team_summary_count_tasks() {
        let (users, scores) = fixture();
        let team = Team {
            id: Uuid::from_u128(100),
            name: "Frontend Avengers".to_string(),
            lead_id: Uuid::from_u128(99),
            member_ids: [Uuid::from_u128(1), Uuid::from_u128(2)].into_iter().collect(),
            project: "Customer Portal Redesign".to_string(),
            description: String::new(),
        };
        let now = Utc::now();
        let mk = |n: u128, status: TaskStatus, age: i64| Task {
            id: Uuid::from_u128(1000 + n),
            employee_id: Uuid::from_u128(1),
            title: format!("task {n}"),
            description: "d".to_string(),
            github_repo_link: "https://github.com/a/b".to_string(),
            tech_stacks: BTreeSet::from(["react".to_string()]),
            status,
            submitted_at: now - Duration::hours(age),
            updated_at: now,
            analysis_id: None,
            review_id: None,
            team_id: team.id,
        };
        let mut tasks = vec![
            mk(1, TaskStatus::Completed, 3),
            mk(2, TaskStatus::UnderReview, 1),
            mk(3, TaskStatus::PendingAnalysis, 2),
            mk(4, TaskStatus::Rejected, 1),
        ];

        let stats = task_stats(&tasks);
        assert_eq!(
            stats,
            TaskStats {
                total: 4,
                awaiting: 2,
                completed: 1,
                rejected: 1
            }
        );

        sort_newest_first(&mut tasks);
        let order: Vec<u128> = tasks.iter().map(|t| t.id.as_u128() - 1000).collect();
        assert_eq!(order, vec![2, 4, 3, 1]);

        let summaries = team_summaries(&[team], &users, &tasks, &scores, 3);
        assert_eq!(summaries[0].task_count, 4);
        assert_eq!(summaries[0].completed_count, 1);
        assert_eq!(summaries[0].lead_name, UNKNOWN_EMPLOYEE);
        assert_eq!(summaries[0].members.len(), 2);
        assert_eq!(summaries[0].members[0].top_skills[0], ("react".to_string(), 9.0));
    }
}
