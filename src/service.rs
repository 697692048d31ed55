//! The review desk: submission, analysis, review and the read-side views,
//! on top of an injected [`Repository`] and [`Analyzer`].

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::Analyzer;
use crate::config::DeskSettings;
use crate::error::{DeskError, Result, ValidationError};
use crate::models::{
    Analysis, EmployeeScore, NewReview, NewTask, NewTeam, NewUser, Review, Role, Task, TaskFilter,
    TaskStatus, Team, User,
};
use crate::queries::{
    self, LeaderboardEntry, SkillMatrix, TaskStats, TeamSummary, TopMemberPerTechStack,
};
use crate::store::Repository;
use crate::validation;

/// One async mutex per entity id. Holders of a task lock may then take the
/// owning employee's lock, never the reverse.
#[derive(Default)]
struct EntityLocks {
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl EntityLocks {
    async fn lock(&self, id: Uuid) -> EntityGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(id).or_default().clone()
        };
        EntityGuard {
            locks: self,
            id,
            guard: Some(lock.lock_owned().await),
        }
    }
}

/// Releases the entity lock and drops its map entry once nobody else holds
/// or waits on it.
struct EntityGuard<'a> {
    locks: &'a EntityLocks,
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EntityGuard<'_> {
    fn drop(&mut self) {
        // The guard owns one handle; release it before counting.
        drop(self.guard.take());
        let mut locks = self.locks.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.id);
        }
    }
}

pub struct ReviewDesk {
    store: Arc<dyn Repository>,
    analyzer: Arc<dyn Analyzer>,
    settings: DeskSettings,
    locks: EntityLocks,
    /// Held by every write that touches `User.team_id` or `Team.member_ids`.
    membership: tokio::sync::Mutex<()>,
}

impl ReviewDesk {
    pub fn new(
        store: Arc<dyn Repository>,
        analyzer: Arc<dyn Analyzer>,
        settings: DeskSettings,
    ) -> Self {
        Self {
            store,
            analyzer,
            settings,
            locks: EntityLocks::default(),
            membership: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn Repository> {
        &self.store
    }

    pub async fn submit_task(&self, input: NewTask) -> Result<Task> {
        let tech_stacks = validation::validate_new_task(&input)?;

        let employee = self
            .store
            .get_user(input.employee_id)
            .await?
            .ok_or_else(|| DeskError::not_found("employee", input.employee_id))?;
        let team = self
            .store
            .get_team(input.team_id)
            .await?
            .ok_or_else(|| DeskError::not_found("team", input.team_id))?;

        let mut errors = ValidationError::default();
        if employee.role != Role::Employee {
            errors.push("employeeId", "only employees submit tasks");
        }
        if !team.member_ids.contains(&employee.id) {
            errors.push("teamId", "employee is not a member of this team");
        }
        errors.into_result()?;

        let task = Task::submitted(input, tech_stacks, Utc::now());
        self.store.insert_task(&task).await?;
        info!(
            task_id = %task.id,
            employee = %employee.name,
            stacks = ?task.tech_stacks,
            "task submitted"
        );
        Ok(task)
    }

    /// Runs the analyzer for a pending task and moves it to under-review.
    ///
    /// The task lock is held across the analyzer call so a second request
    /// for the same task waits and then fails the state check.
    pub async fn analyze_repo(&self, task_id: Uuid) -> Result<Analysis> {
        let _guard = self.locks.lock(task_id).await;

        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| DeskError::not_found("task", task_id))?;
        // Fail before spending analyzer time on a task that cannot advance.
        task.transition(crate::lifecycle::TaskEvent::AnalysisCompleted, Utc::now())?;

        let timeout = self.settings.analysis_timeout;
        let analysis = match tokio::time::timeout(timeout, self.analyzer.analyze(&task)).await {
            Ok(Ok(analysis)) => analysis,
            Ok(Err(err)) => {
                warn!(%task_id, error = %err, "analysis failed");
                return Err(DeskError::AnalysisFailed {
                    task_id,
                    reason: format!("{err:#}"),
                });
            }
            Err(_) => {
                warn!(%task_id, ?timeout, "analysis timed out");
                return Err(DeskError::AnalysisTimedOut { task_id, timeout });
            }
        };
        if analysis.task_id != task_id {
            return Err(DeskError::AnalysisFailed {
                task_id,
                reason: format!("report references task {}", analysis.task_id),
            });
        }

        self.store.insert_analysis(&analysis).await?;
        self.on_analysis_complete(task_id, analysis.id).await?;
        info!(%task_id, analysis_id = %analysis.id, score = analysis.overall_score, "analysis attached");
        Ok(analysis)
    }

    /// Links an analysis and advances the task. A missing task is a no-op.
    async fn on_analysis_complete(&self, task_id: Uuid, analysis_id: Uuid) -> Result<Option<Task>> {
        let Some(task) = self.store.get_task(task_id).await? else {
            debug!(%task_id, "analysis completed for unknown task");
            return Ok(None);
        };
        let task = task.record_analysis(analysis_id, Utc::now())?;
        self.store.update_task(&task).await?;
        Ok(Some(task))
    }

    /// Records the one review a task gets, closes the task and folds the
    /// scores into the owner's aggregate.
    pub async fn submit_review(&self, input: NewReview) -> Result<Review> {
        let task_id = input.task_id;
        let _task_guard = self.locks.lock(task_id).await;

        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| DeskError::not_found("task", task_id))?;
        if task.review_id.is_some() {
            warn!(%task_id, "second review rejected");
            return Err(DeskError::DuplicateReview(task_id));
        }
        if task.status != TaskStatus::UnderReview {
            return Err(crate::error::InvalidStateTransition {
                task_id,
                from: task.status,
                event: "review",
            }
            .into());
        }

        let scores = validation::validate_new_review(&input, &task.tech_stacks)?;
        match self.store.get_user(input.admin_id).await? {
            Some(admin) if admin.role == Role::Admin => {}
            Some(_) => {
                let mut errors = ValidationError::default();
                errors.push("adminId", "reviewer must be an admin");
                return Err(errors.into());
            }
            None => return Err(DeskError::not_found("admin", input.admin_id)),
        }

        let review = Review {
            id: Uuid::new_v4(),
            task_id,
            admin_id: input.admin_id,
            feedback: input.feedback.trim().to_string(),
            scores,
            decision: input.decision,
            reviewed_at: Utc::now(),
        };
        self.store.insert_review(&review).await?;

        let task = self.on_review_submitted(&task, &review).await?;
        self.fold_scores(&task, &review).await?;

        info!(
            %task_id,
            review_id = %review.id,
            decision = review.decision.as_str(),
            "review recorded"
        );
        Ok(review)
    }

    async fn on_review_submitted(&self, task: &Task, review: &Review) -> Result<Task> {
        let task = task.record_review(review.id, review.decision, Utc::now())?;
        self.store.update_task(&task).await?;
        Ok(task)
    }

    /// The only writer of employee score aggregates.
    async fn fold_scores(&self, task: &Task, review: &Review) -> Result<EmployeeScore> {
        let _guard = self.locks.lock(task.employee_id).await;
        let mut score = self
            .store
            .get_score(task.employee_id)
            .await?
            .unwrap_or_else(|| EmployeeScore::empty(task.employee_id));
        score.apply_review(&review.scores, review.decision);
        self.store.save_score(&score).await?;
        debug!(
            employee_id = %task.employee_id,
            overall = score.overall_average,
            "employee score updated"
        );
        Ok(score)
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.store.get_task(id).await?)
    }

    /// Matching tasks, newest submission first.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut tasks = self.store.list_tasks(filter).await?;
        queries::sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    pub async fn get_analysis_by_task(&self, task_id: Uuid) -> Result<Option<Analysis>> {
        Ok(self.store.analysis_for_task(task_id).await?)
    }

    pub async fn get_review_by_task(&self, task_id: Uuid) -> Result<Option<Review>> {
        Ok(self.store.review_for_task(task_id).await?)
    }

    pub async fn reviews_by_admin(&self, admin_id: Uuid) -> Result<Vec<Review>> {
        let mut reviews = self.store.list_reviews().await?;
        reviews.retain(|review| review.admin_id == admin_id);
        reviews.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
        Ok(reviews)
    }

    pub async fn reviews_by_employee(&self, employee_id: Uuid) -> Result<Vec<Review>> {
        let filter = TaskFilter {
            employee_id: Some(employee_id),
            ..TaskFilter::default()
        };
        let task_ids: BTreeSet<Uuid> = self
            .store
            .list_tasks(&filter)
            .await?
            .into_iter()
            .map(|task| task.id)
            .collect();
        let mut reviews = self.store.list_reviews().await?;
        reviews.retain(|review| task_ids.contains(&review.task_id));
        reviews.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
        Ok(reviews)
    }

    pub async fn get_employee_score(&self, employee_id: Uuid) -> Result<Option<EmployeeScore>> {
        Ok(self.store.get_score(employee_id).await?)
    }

    pub async fn get_top_members_per_tech_stack(&self) -> Result<Vec<TopMemberPerTechStack>> {
        let users = self.store.list_users().await?;
        let scores = self.store.list_scores().await?;
        Ok(queries::top_members_per_tech_stack(
            &users,
            &scores,
            self.settings.top_members,
        ))
    }

    pub async fn leaderboard(&self, limit: Option<usize>) -> Result<Vec<LeaderboardEntry>> {
        let users = self.store.list_users().await?;
        let scores = self.store.list_scores().await?;
        Ok(queries::leaderboard(&users, &scores, limit))
    }

    pub async fn skill_matrix(&self) -> Result<SkillMatrix> {
        let users = self.store.list_users().await?;
        let scores = self.store.list_scores().await?;
        Ok(queries::skill_matrix(&users, &scores))
    }

    pub async fn task_stats(&self) -> Result<TaskStats> {
        let tasks = self.store.list_tasks(&TaskFilter::default()).await?;
        Ok(queries::task_stats(&tasks))
    }

    pub async fn team_summaries(&self) -> Result<Vec<TeamSummary>> {
        let teams = self.store.list_teams().await?;
        let users = self.store.list_users().await?;
        let tasks = self.store.list_tasks(&TaskFilter::default()).await?;
        let scores = self.store.list_scores().await?;
        Ok(queries::team_summaries(
            &teams,
            &users,
            &tasks,
            &scores,
            self.settings.skills_per_member,
        ))
    }

    /// Technologies an employee has submitted work under.
    pub async fn employee_tech_stacks(&self, employee_id: Uuid) -> Result<BTreeSet<String>> {
        let filter = TaskFilter {
            employee_id: Some(employee_id),
            ..TaskFilter::default()
        };
        Ok(self
            .store
            .list_tasks(&filter)
            .await?
            .into_iter()
            .flat_map(|task| task.tech_stacks)
            .collect())
    }

    pub async fn add_user(&self, input: NewUser) -> Result<User> {
        validation::validate_new_user(&input)?;
        let _membership = self.membership.lock().await;
        let team = match input.team_id {
            Some(team_id) => Some(
                self.store
                    .get_team(team_id)
                    .await?
                    .ok_or_else(|| DeskError::not_found("team", team_id))?,
            ),
            None => None,
        };
        let user = User {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            role: input.role,
            team_id: input.team_id,
            designation: input.designation.trim().to_string(),
        };
        self.store.insert_user(&user).await?;
        if let Some(mut team) = team {
            team.member_ids.insert(user.id);
            self.store.update_team(&team).await?;
        }
        info!(user_id = %user.id, role = user.role.as_str(), "user added");
        Ok(user)
    }

    pub async fn list_employees(&self) -> Result<Vec<User>> {
        let mut users = self.store.list_users().await?;
        users.retain(|user| user.role == Role::Employee);
        Ok(users)
    }

    pub async fn get_employee(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.store.get_user(id).await?)
    }

    /// Moves a user to another team, keeping both teams' member sets in
    /// step with `User.team_id`.
    pub async fn reassign_team(&self, user_id: Uuid, team_id: Uuid) -> Result<User> {
        let _membership = self.membership.lock().await;
        let mut team = self
            .store
            .get_team(team_id)
            .await?
            .ok_or_else(|| DeskError::not_found("team", team_id))?;
        let mut user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| DeskError::not_found("user", user_id))?;

        self.leave_current_team(&user, team_id).await?;
        if team.member_ids.insert(user_id) {
            self.store.update_team(&team).await?;
        }
        user.team_id = Some(team_id);
        self.store.update_user(&user).await?;
        info!(%user_id, %team_id, "user reassigned");
        Ok(user)
    }

    /// Drops `user` from the member set of its current team unless that team
    /// is `next`. Callers hold the membership lock.
    async fn leave_current_team(&self, user: &User, next: Uuid) -> Result<()> {
        let Some(current) = user.team_id.filter(|id| *id != next) else {
            return Ok(());
        };
        if let Some(mut team) = self.store.get_team(current).await? {
            if team.member_ids.remove(&user.id) {
                self.store.update_team(&team).await?;
            }
        }
        Ok(())
    }

    pub async fn add_team(&self, input: NewTeam) -> Result<Team> {
        let lead = match input.lead_id {
            Some(id) => self.store.get_user(id).await?,
            None => None,
        };
        validation::validate_new_team(&input, lead.as_ref())?;

        let _membership = self.membership.lock().await;
        let mut members = Vec::with_capacity(input.member_ids.len());
        for member_id in &input.member_ids {
            match self.store.get_user(*member_id).await? {
                Some(member) => members.push(member),
                None => return Err(DeskError::not_found("member", *member_id)),
            }
        }

        let team = Team {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            lead_id: lead.map(|user| user.id).unwrap_or_default(),
            member_ids: input.member_ids.into_iter().collect(),
            project: input.project.trim().to_string(),
            description: input.description.trim().to_string(),
        };
        self.store.insert_team(&team).await?;
        for mut member in members {
            if member.team_id == Some(team.id) {
                continue;
            }
            self.leave_current_team(&member, team.id).await?;
            member.team_id = Some(team.id);
            self.store.update_user(&member).await?;
        }
        info!(team_id = %team.id, members = team.member_ids.len(), "team added");
        Ok(team)
    }

    pub async fn list_teams(&self) -> Result<Vec<Team>> {
        Ok(self.store.list_teams().await?)
    }

    pub async fn get_team(&self, id: Uuid) -> Result<Option<Team>> {
        Ok(self.store.get_team(id).await?)
    }
}
