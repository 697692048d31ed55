use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;
use crate::models::{NewReview, NewTask, NewTeam, NewUser, Role, User};
use crate::tech;

static GITHUB_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(www\.)?github\.com/[\w.-]+/[\w.-]+(/.*)?$")
        .expect("github url pattern compiles")
});

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 10;

pub fn is_valid_github_url(url: &str) -> bool {
    GITHUB_URL.is_match(url)
}

pub fn is_required(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Checks a submission and returns its tech stacks normalized and deduplicated.
pub fn validate_new_task(input: &NewTask) -> Result<BTreeSet<String>, ValidationError> {
    let mut errors = ValidationError::default();

    if !is_required(&input.title) {
        errors.push("title", "is required");
    }
    if !is_required(&input.description) {
        errors.push("description", "is required");
    }
    if !is_required(&input.github_repo_link) {
        errors.push("githubRepoLink", "is required");
    } else if !is_valid_github_url(input.github_repo_link.trim()) {
        errors.push("githubRepoLink", "must be a GitHub repository URL");
    }

    let mut stacks = BTreeSet::new();
    for raw in &input.tech_stacks {
        let tech = tech::normalize(raw);
        if tech.is_empty() {
            continue;
        }
        if !tech::is_known(&tech) {
            errors.push("techStacks", format!("unknown technology '{tech}'"));
            continue;
        }
        stacks.insert(tech);
    }
    if stacks.is_empty() && !errors.has_field("techStacks") {
        errors.push("techStacks", "select at least one technology");
    }

    errors.into_result().map(|()| stacks)
}

/// Checks reviewer input against the task's tech stacks and narrows the
/// scores to the stored range.
pub fn validate_new_review(
    input: &NewReview,
    task_stacks: &BTreeSet<String>,
) -> Result<BTreeMap<String, u8>, ValidationError> {
    let mut errors = ValidationError::default();

    if !is_required(&input.feedback) {
        errors.push("feedback", "is required");
    }

    let mut scores = BTreeMap::new();
    for (raw, value) in &input.scores {
        let tech = tech::normalize(raw);
        if !task_stacks.contains(&tech) {
            errors.push(
                format!("scores.{tech}"),
                "technology is not part of this task",
            );
            continue;
        }
        if scores.contains_key(&tech) {
            errors.push(format!("scores.{tech}"), "duplicate technology");
            continue;
        }
        match u8::try_from(*value) {
            Ok(score) if (MIN_SCORE..=MAX_SCORE).contains(value) => {
                scores.insert(tech, score);
            }
            _ => errors.push(
                format!("scores.{tech}"),
                format!("must be between {MIN_SCORE} and {MAX_SCORE}"),
            ),
        }
    }

    errors.into_result().map(|()| scores)
}

pub fn validate_new_user(input: &NewUser) -> Result<(), ValidationError> {
    let mut errors = ValidationError::default();
    if !is_required(&input.name) {
        errors.push("name", "is required");
    }
    if !is_required(&input.email) {
        errors.push("email", "is required");
    } else if !input.email.contains('@') {
        errors.push("email", "must be an email address");
    }
    errors.into_result()
}

/// `lead` is the resolved user for `input.lead_id`, if any.
pub fn validate_new_team(input: &NewTeam, lead: Option<&User>) -> Result<(), ValidationError> {
    let mut errors = ValidationError::default();
    if !is_required(&input.name) {
        errors.push("name", "Team name is required");
    }
    if !is_required(&input.project) {
        errors.push("project", "Project is required");
    }
    match (input.lead_id, lead) {
        (None, _) => errors.push("leadId", "Lead is required"),
        (Some(_), None) => errors.push("leadId", "Lead does not exist"),
        (Some(_), Some(user)) if user.role != Role::Admin => {
            errors.push("leadId", "Lead must be an admin")
        }
        _ => {}
    }
    if input.member_ids.is_empty() {
        errors.push("members", "Select at least one member");
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn task_input(repo: &str, stacks: &[&str]) -> NewTask {
        NewTask {
            employee_id: Uuid::new_v4(),
            title: "Customer portal".to_string(),
            description: "Login and dashboard".to_string(),
            github_repo_link: repo.to_string(),
            tech_stacks: stacks.iter().map(|s| s.to_string()).collect(),
            team_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn github_pattern_requires_scheme_owner_and_repo() {
        assert!(is_valid_github_url("https://github.com/alice/app"));
        assert!(is_valid_github_url("http://www.github.com/alice/app/tree/main"));
        assert!(is_valid_github_url("https://github.com/a-b.c/repo_1"));
        assert!(!is_valid_github_url("github.com/alice/app"));
        assert!(!is_valid_github_url("https://github.com/alice"));
        assert!(!is_valid_github_url("https://gitlab.com/alice/app"));
    }

    #[test]
    fn task_stacks_are_normalized_and_deduplicated() {
        let stacks =
            validate_new_task(&task_input("https://github.com/alice/app", &["React", "react", "nodejs"]))
                .unwrap();
        assert_eq!(
            stacks.into_iter().collect::<Vec<_>>(),
            vec!["nodejs".to_string(), "react".to_string()]
        );
    }

    #[test]
    fn task_errors_are_reported_per_field() {
        let mut input = task_input("github.com/alice/app", &[]);
        input.title = "   ".to_string();

        let err = validate_new_task(&input).unwrap_err();
        assert!(err.has_field("title"));
        assert!(err.has_field("githubRepoLink"));
        assert!(err.has_field("techStacks"));
        assert!(!err.has_field("description"));
    }

    #[test]
    fn unknown_technology_is_rejected() {
        let err = validate_new_task(&task_input("https://github.com/alice/app", &["cobol"]))
            .unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field, "techStacks");
    }

    #[test]
    fn review_scores_must_be_in_range_and_on_the_task() {
        let stacks = BTreeSet::from(["react".to_string(), "nodejs".to_string()]);
        let input = NewReview {
            task_id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            feedback: "Solid work".to_string(),
            scores: BTreeMap::from([
                ("react".to_string(), 11),
                ("nodejs".to_string(), 0),
                ("python".to_string(), 5),
            ]),
            decision: crate::models::Decision::Completed,
        };

        let err = validate_new_review(&input, &stacks).unwrap_err();
        assert!(err.has_field("scores.react"));
        assert!(err.has_field("scores.nodejs"));
        assert!(err.has_field("scores.python"));
    }

    #[test]
    fn score_keys_differing_only_in_case_are_duplicates() {
        let stacks = BTreeSet::from(["react".to_string()]);
        let input = NewReview {
            task_id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            feedback: "Solid work".to_string(),
            scores: BTreeMap::from([("React".to_string(), 9), ("react".to_string(), 3)]),
            decision: crate::models::Decision::Completed,
        };

        let err = validate_new_review(&input, &stacks).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field, "scores.react");
        assert_eq!(err.errors[0].message, "duplicate technology");
    }

    #[test]
    fn review_requires_feedback_but_allows_no_scores() {
        let stacks = BTreeSet::from(["react".to_string()]);
        let mut input = NewReview {
            task_id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            feedback: String::new(),
            scores: BTreeMap::new(),
            decision: crate::models::Decision::Rejected,
        };
        assert!(validate_new_review(&input, &stacks).unwrap_err().has_field("feedback"));

        input.feedback = "Needs tests".to_string();
        assert!(validate_new_review(&input, &stacks).unwrap().is_empty());
    }

    #[test]
    fn team_lead_must_be_an_admin() {
        let employee = User {
            id: Uuid::new_v4(),
            name: "Jules".to_string(),
            email: "jules@example.com".to_string(),
            role: Role::Employee,
            team_id: None,
            designation: "Intern".to_string(),
        };
        let input = NewTeam {
            name: "Cloud Ninjas".to_string(),
            lead_id: Some(employee.id),
            member_ids: vec![],
            project: "Infra".to_string(),
            description: String::new(),
        };

        let err = validate_new_team(&input, Some(&employee)).unwrap_err();
        assert!(err.has_field("leadId"));
        assert!(err.has_field("members"));
    }
}
