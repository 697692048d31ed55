use std::collections::BTreeMap;

use uuid::Uuid;

use crate::models::{Decision, EmployeeScore, TechStackScore};

/// Rounds to one decimal place. Stored averages keep full precision; only
/// views go through this.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl EmployeeScore {
    pub fn empty(employee_id: Uuid) -> Self {
        Self {
            employee_id,
            scores: BTreeMap::new(),
            overall_average: 0.0,
            total_tasks_completed: 0,
            total_tasks_rejected: 0,
        }
    }

    /// `false` while the employee has no scored technology. Such records
    /// carry an overall of 0, which is a sentinel and not a real score.
    pub fn is_scored(&self) -> bool {
        self.overall_average > 0.0
    }

    /// Folds one review into the running aggregate.
    pub fn apply_review(&mut self, scores: &BTreeMap<String, u8>, decision: Decision) {
        for (tech, score) in scores {
            let entry = self.scores.entry(tech.clone()).or_default();
            entry.total += u32::from(*score);
            entry.count += 1;
            entry.average = entry.total as f64 / entry.count as f64;
        }

        self.overall_average = overall_average(&self.scores);

        match decision {
            Decision::Completed => self.total_tasks_completed += 1,
            Decision::Rejected => self.total_tasks_rejected += 1,
        }
    }

    /// Scored technologies, best first.
    pub fn top_skills(&self, limit: usize) -> Vec<(&str, f64)> {
        let mut skills: Vec<(&str, f64)> = self
            .scores
            .iter()
            .filter(|(_, score)| score.count > 0)
            .map(|(tech, score)| (tech.as_str(), score.average))
            .collect();
        skills.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        skills.truncate(limit);
        skills
    }
}

/// Mean of the per-technology averages, not of the raw scores.
pub fn overall_average(scores: &BTreeMap<String, TechStackScore>) -> f64 {
    let averages: Vec<f64> = scores
        .values()
        .filter(|score| score.count > 0)
        .map(|score| score.average)
        .collect();

    if averages.is_empty() {
        0.0
    } else {
        averages.iter().sum::<f64>() / averages.len() as f64
    }
}
