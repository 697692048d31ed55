//! Code-quality analysis of a submitted repository.
//!
//! The desk only depends on [`Analyzer`]. [`SimulatedAnalyzer`] stands in for
//! an external service: it waits out a configurable latency and produces
//! randomized scores. [`FixedAnalyzer`] is deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::models::{Analysis, AnalysisCategories, CategoryScore, Severity, Suggestion, Task};

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Produces a report for `task`. The report must reference `task.id`.
    async fn analyze(&self, task: &Task) -> anyhow::Result<Analysis>;
}

const SUMMARY: &str = "Code analysis completed. The repository demonstrates a good \
understanding of the core concepts. There are some areas for improvement in code \
organization and error handling.";

#[derive(Debug, Clone)]
pub struct SimulatedAnalyzer {
    delay: Duration,
}

impl SimulatedAnalyzer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Analyzer for SimulatedAnalyzer {
    async fn analyze(&self, task: &Task) -> anyhow::Result<Analysis> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut rng = rand::thread_rng();
        let mut category = |base: u8, spread: u8, remarks: &str| CategoryScore {
            score: base + rng.gen_range(0..spread),
            remarks: remarks.to_string(),
        };
        let categories = AnalysisCategories {
            code_quality: category(
                65,
                25,
                "Generally clean code with room for improvement in function decomposition",
            ),
            security: category(55, 30, "Basic security practices followed, some improvements needed"),
            performance: category(65, 25, "Adequate performance, optimization opportunities exist"),
            best_practices: category(60, 25, "Follows most best practices with some deviations"),
            documentation: category(50, 30, "Documentation present but could be more comprehensive"),
        };

        Ok(Analysis {
            id: Uuid::new_v4(),
            task_id: task.id,
            repo_link: task.github_repo_link.clone(),
            analyzed_at: Utc::now(),
            overall_score: 60 + rng.gen_range(0..30),
            summary: SUMMARY.to_string(),
            categories,
            suggestions: default_suggestions(),
            files_analyzed: rng.gen_range(5..25),
            lines_of_code: rng.gen_range(500..3500),
            languages: language_breakdown(&task.tech_stacks),
        })
    }
}

/// Returns the same report shape and numbers on every call.
#[derive(Debug, Clone)]
pub struct FixedAnalyzer {
    pub score: u8,
}

impl Default for FixedAnalyzer {
    fn default() -> Self {
        Self { score: 75 }
    }
}

#[async_trait]
impl Analyzer for FixedAnalyzer {
    async fn analyze(&self, task: &Task) -> anyhow::Result<Analysis> {
        let category = |remarks: &str| CategoryScore {
            score: self.score,
            remarks: remarks.to_string(),
        };
        Ok(Analysis {
            id: Uuid::new_v4(),
            task_id: task.id,
            repo_link: task.github_repo_link.clone(),
            analyzed_at: Utc::now(),
            overall_score: self.score,
            summary: SUMMARY.to_string(),
            categories: AnalysisCategories {
                code_quality: category("code quality"),
                security: category("security"),
                performance: category("performance"),
                best_practices: category("best practices"),
                documentation: category("documentation"),
            },
            suggestions: default_suggestions(),
            files_analyzed: 12,
            lines_of_code: 1200,
            languages: language_breakdown(&task.tech_stacks),
        })
    }
}

fn default_suggestions() -> Vec<Suggestion> {
    [
        (Severity::Medium, "Consider adding more comprehensive error handling"),
        (Severity::Low, "Add inline documentation for complex logic"),
        (Severity::Medium, "Improve test coverage for edge cases"),
    ]
    .into_iter()
    .map(|(severity, message)| Suggestion {
        severity,
        message: message.to_string(),
    })
    .collect()
}

/// Splits 100% evenly across the task's stacks; the remainder goes to the
/// first ones in order.
fn language_breakdown(stacks: &BTreeSet<String>) -> BTreeMap<String, u8> {
    if stacks.is_empty() {
        return BTreeMap::new();
    }
    let n = stacks.len();
    let share = 100 / n;
    let remainder = 100 % n;
    stacks
        .iter()
        .enumerate()
        .map(|(index, tech)| {
            let percent = share + usize::from(index < remainder);
            (tech.clone(), u8::try_from(percent).unwrap_or(100))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

    fn task(stacks: &[&str]) -> Task {
        Task {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            title: "Portal".to_string(),
            description: "Customer portal".to_string(),
            github_repo_link: "https://github.com/kiara/portal".to_string(),
            tech_stacks: stacks.iter().map(|s| s.to_string()).collect(),
            status: TaskStatus::PendingAnalysis,
            submitted_at: Utc::now(),
            updated_at: Utc::now(),
            analysis_id: None,
            review_id: None,
            team_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn breakdown_always_sums_to_one_hundred() {
        let stacks: BTreeSet<String> = ["react", "nodejs", "sql"].iter().map(|s| s.to_string()).collect();
        let breakdown = language_breakdown(&stacks);
        assert_eq!(breakdown.values().map(|v| u32::from(*v)).sum::<u32>(), 100);
        assert_eq!(breakdown["nodejs"], 34);
        assert_eq!(breakdown["sql"], 33);
    }

    #[tokio::test]
    async fn simulated_report_is_structurally_valid() {
        let analyzer = SimulatedAnalyzer::new(Duration::ZERO);
        let task = task(&["react", "typescript"]);
        let analysis = analyzer.analyze(&task).await.unwrap();

        assert_eq!(analysis.task_id, task.id);
        assert_eq!(analysis.repo_link, task.github_repo_link);
        assert!((60..90).contains(&analysis.overall_score));
        assert_eq!(analysis.categories.iter().count(), 5);
        for (_, category) in analysis.categories.iter() {
            assert!(category.score <= 100);
            assert!(!category.remarks.is_empty());
        }
        assert_eq!(analysis.suggestions.len(), 3);
        assert!((5..25).contains(&analysis.files_analyzed));
    }

    #[tokio::test]
    async fn fixed_analyzer_is_deterministic() {
        let analyzer = FixedAnalyzer { score: 82 };
        let task = task(&["python"]);
        let first = analyzer.analyze(&task).await.unwrap();
        let second = analyzer.analyze(&task).await.unwrap();

        assert_eq!(first.overall_score, 82);
        assert_eq!(first.categories, second.categories);
        assert_eq!(first.languages, BTreeMap::from([("python".to_string(), 100)]));
    }
}
