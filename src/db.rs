use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use crate::models::{
    Analysis, AnalysisCategories, EmployeeScore, Review, Suggestion, Task, TaskFilter,
    TechStackScore, Team, User,
};
use crate::store::Repository;

const USER_COLUMNS: &str = "id, name, email, role, team_id, designation";
const TEAM_COLUMNS: &str = "id, name, lead_id, member_ids, project, description";
const TASK_COLUMNS: &str = "id, employee_id, title, description, github_repo_link, tech_stacks, \
     status, submitted_at, updated_at, analysis_id, review_id, team_id";
const ANALYSIS_COLUMNS: &str = "id, task_id, repo_link, analyzed_at, overall_score, summary, \
     categories, suggestions, files_analyzed, lines_of_code, languages";
const REVIEW_COLUMNS: &str = "id, task_id, admin_id, feedback, scores, decision, reviewed_at";
const SCORE_COLUMNS: &str =
    "employee_id, scores, overall_average, total_tasks_completed, total_tasks_rejected";

/// Postgres-backed [`Repository`]. Tables live in the `taskflow` schema.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        Ok(Self { pool })
    }

    pub async fn init_db(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to apply migrations")?;
        Ok(())
    }
}

fn to_i32(value: u32, column: &str) -> anyhow::Result<i32> {
    i32::try_from(value).with_context(|| format!("{column} out of range: {value}"))
}

fn to_u32(value: i32, column: &str) -> anyhow::Result<u32> {
    u32::try_from(value).with_context(|| format!("{column} out of range: {value}"))
}

fn user_from_row(row: &PgRow) -> anyhow::Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: role.parse()?,
        team_id: row.try_get("team_id")?,
        designation: row.try_get("designation")?,
    })
}

fn team_from_row(row: &PgRow) -> anyhow::Result<Team> {
    let members: Vec<Uuid> = row.try_get("member_ids")?;
    Ok(Team {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        lead_id: row.try_get("lead_id")?,
        member_ids: members.into_iter().collect(),
        project: row.try_get("project")?,
        description: row.try_get("description")?,
    })
}

fn task_from_row(row: &PgRow) -> anyhow::Result<Task> {
    let stacks: Vec<String> = row.try_get("tech_stacks")?;
    let status: String = row.try_get("status")?;
    Ok(Task {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        github_repo_link: row.try_get("github_repo_link")?,
        tech_stacks: stacks.into_iter().collect(),
        status: status.parse()?,
        submitted_at: row.try_get("submitted_at")?,
        updated_at: row.try_get("updated_at")?,
        analysis_id: row.try_get("analysis_id")?,
        review_id: row.try_get("review_id")?,
        team_id: row.try_get("team_id")?,
    })
}

fn analysis_from_row(row: &PgRow) -> anyhow::Result<Analysis> {
    let overall: i32 = row.try_get("overall_score")?;
    let categories: Json<AnalysisCategories> = row.try_get("categories")?;
    let suggestions: Json<Vec<Suggestion>> = row.try_get("suggestions")?;
    let languages: Json<BTreeMap<String, u8>> = row.try_get("languages")?;
    Ok(Analysis {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        repo_link: row.try_get("repo_link")?,
        analyzed_at: row.try_get("analyzed_at")?,
        overall_score: u8::try_from(overall).context("overall_score out of range")?,
        summary: row.try_get("summary")?,
        categories: categories.0,
        suggestions: suggestions.0,
        files_analyzed: to_u32(row.try_get("files_analyzed")?, "files_analyzed")?,
        lines_of_code: to_u32(row.try_get("lines_of_code")?, "lines_of_code")?,
        languages: languages.0,
    })
}

fn review_from_row(row: &PgRow) -> anyhow::Result<Review> {
    let scores: Json<BTreeMap<String, u8>> = row.try_get("scores")?;
    let decision: String = row.try_get("decision")?;
    Ok(Review {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        admin_id: row.try_get("admin_id")?,
        feedback: row.try_get("feedback")?,
        scores: scores.0,
        decision: decision.parse()?,
        reviewed_at: row.try_get("reviewed_at")?,
    })
}

fn score_from_row(row: &PgRow) -> anyhow::Result<EmployeeScore> {
    let scores: Json<BTreeMap<String, TechStackScore>> = row.try_get("scores")?;
    Ok(EmployeeScore {
        employee_id: row.try_get("employee_id")?,
        scores: scores.0,
        overall_average: row.try_get("overall_average")?,
        total_tasks_completed: to_u32(
            row.try_get("total_tasks_completed")?,
            "total_tasks_completed",
        )?,
        total_tasks_rejected: to_u32(row.try_get("total_tasks_rejected")?, "total_tasks_rejected")?,
    })
}

#[async_trait]
impl Repository for PgStore {
    async fn insert_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO taskflow.users (id, name, email, role, team_id, designation)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.team_id)
        .bind(&user.designation)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert user {}", user.id))?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE taskflow.users
            SET name = $2, email = $3, role = $4, team_id = $5, designation = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.team_id)
        .bind(&user.designation)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("user {} does not exist", user.id);
        }
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM taskflow.users WHERE id = $1");
        sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM taskflow.users ORDER BY name, id");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn insert_team(&self, team: &Team) -> anyhow::Result<()> {
        let members: Vec<Uuid> = team.member_ids.iter().copied().collect();
        sqlx::query(
            r#"
            INSERT INTO taskflow.teams (id, name, lead_id, member_ids, project, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(team.id)
        .bind(&team.name)
        .bind(team.lead_id)
        .bind(&members)
        .bind(&team.project)
        .bind(&team.description)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert team {}", team.id))?;
        Ok(())
    }

    async fn update_team(&self, team: &Team) -> anyhow::Result<()> {
        let members: Vec<Uuid> = team.member_ids.iter().copied().collect();
        let result = sqlx::query(
            r#"
            UPDATE taskflow.teams
            SET name = $2, lead_id = $3, member_ids = $4, project = $5, description = $6
            WHERE id = $1
            "#,
        )
        .bind(team.id)
        .bind(&team.name)
        .bind(team.lead_id)
        .bind(&members)
        .bind(&team.project)
        .bind(&team.description)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to update team {}", team.id))?;
        if result.rows_affected() == 0 {
            anyhow::bail!("team {} does not exist", team.id);
        }
        Ok(())
    }

    async fn get_team(&self, id: Uuid) -> anyhow::Result<Option<Team>> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM taskflow.teams WHERE id = $1");
        sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(team_from_row)
            .transpose()
    }

    async fn list_teams(&self) -> anyhow::Result<Vec<Team>> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM taskflow.teams ORDER BY name, id");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(team_from_row).collect()
    }

    async fn insert_task(&self, task: &Task) -> anyhow::Result<()> {
        let stacks: Vec<String> = task.tech_stacks.iter().cloned().collect();
        sqlx::query(
            r#"
            INSERT INTO taskflow.tasks
            (id, employee_id, title, description, github_repo_link, tech_stacks,
             status, submitted_at, updated_at, analysis_id, review_id, team_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(task.id)
        .bind(task.employee_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.github_repo_link)
        .bind(&stacks)
        .bind(task.status.as_str())
        .bind(task.submitted_at)
        .bind(task.updated_at)
        .bind(task.analysis_id)
        .bind(task.review_id)
        .bind(task.team_id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert task {}", task.id))?;
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE taskflow.tasks
            SET status = $2, updated_at = $3, analysis_id = $4, review_id = $5
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(task.status.as_str())
        .bind(task.updated_at)
        .bind(task.analysis_id)
        .bind(task.review_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("task {} does not exist", task.id);
        }
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        let query = format!("SELECT {TASK_COLUMNS} FROM taskflow.tasks WHERE id = $1");
        sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(task_from_row)
            .transpose()
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> anyhow::Result<Vec<Task>> {
        let mut query = format!("SELECT {TASK_COLUMNS} FROM taskflow.tasks WHERE TRUE");
        let mut param = 0;
        if filter.status.is_some() {
            param += 1;
            query.push_str(&format!(" AND status = ${param}"));
        }
        if filter.employee_id.is_some() {
            param += 1;
            query.push_str(&format!(" AND employee_id = ${param}"));
        }
        if filter.team_id.is_some() {
            param += 1;
            query.push_str(&format!(" AND team_id = ${param}"));
        }

        let mut rows = sqlx::query(&query);
        if let Some(status) = filter.status {
            rows = rows.bind(status.as_str());
        }
        if let Some(employee_id) = filter.employee_id {
            rows = rows.bind(employee_id);
        }
        if let Some(team_id) = filter.team_id {
            rows = rows.bind(team_id);
        }

        let records = rows.fetch_all(&self.pool).await?;
        records.iter().map(task_from_row).collect()
    }

    async fn insert_analysis(&self, analysis: &Analysis) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO taskflow.analyses
            (id, task_id, repo_link, analyzed_at, overall_score, summary,
             categories, suggestions, files_analyzed, lines_of_code, languages)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(analysis.id)
        .bind(analysis.task_id)
        .bind(&analysis.repo_link)
        .bind(analysis.analyzed_at)
        .bind(i32::from(analysis.overall_score))
        .bind(&analysis.summary)
        .bind(Json(&analysis.categories))
        .bind(Json(&analysis.suggestions))
        .bind(to_i32(analysis.files_analyzed, "files_analyzed")?)
        .bind(to_i32(analysis.lines_of_code, "lines_of_code")?)
        .bind(Json(&analysis.languages))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert analysis for task {}", analysis.task_id))?;
        Ok(())
    }

    async fn analysis_for_task(&self, task_id: Uuid) -> anyhow::Result<Option<Analysis>> {
        let query = format!("SELECT {ANALYSIS_COLUMNS} FROM taskflow.analyses WHERE task_id = $1");
        sqlx::query(&query)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(analysis_from_row)
            .transpose()
    }

    async fn insert_review(&self, review: &Review) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO taskflow.reviews
            (id, task_id, admin_id, feedback, scores, decision, reviewed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id)
        .bind(review.task_id)
        .bind(review.admin_id)
        .bind(&review.feedback)
        .bind(Json(&review.scores))
        .bind(review.decision.as_str())
        .bind(review.reviewed_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert review for task {}", review.task_id))?;
        Ok(())
    }

    async fn review_for_task(&self, task_id: Uuid) -> anyhow::Result<Option<Review>> {
        let query = format!("SELECT {REVIEW_COLUMNS} FROM taskflow.reviews WHERE task_id = $1");
        sqlx::query(&query)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(review_from_row)
            .transpose()
    }

    async fn list_reviews(&self) -> anyhow::Result<Vec<Review>> {
        let query = format!("SELECT {REVIEW_COLUMNS} FROM taskflow.reviews");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(review_from_row).collect()
    }

    async fn get_score(&self, employee_id: Uuid) -> anyhow::Result<Option<EmployeeScore>> {
        let query = format!(
            "SELECT {SCORE_COLUMNS} FROM taskflow.employee_scores WHERE employee_id = $1"
        );
        sqlx::query(&query)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(score_from_row)
            .transpose()
    }

    async fn save_score(&self, score: &EmployeeScore) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO taskflow.employee_scores
            (employee_id, scores, overall_average, total_tasks_completed, total_tasks_rejected)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (employee_id) DO UPDATE
            SET scores = EXCLUDED.scores,
                overall_average = EXCLUDED.overall_average,
                total_tasks_completed = EXCLUDED.total_tasks_completed,
                total_tasks_rejected = EXCLUDED.total_tasks_rejected
            "#,
        )
        .bind(score.employee_id)
        .bind(Json(&score.scores))
        .bind(score.overall_average)
        .bind(to_i32(score.total_tasks_completed, "total_tasks_completed")?)
        .bind(to_i32(score.total_tasks_rejected, "total_tasks_rejected")?)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save score for {}", score.employee_id))?;
        Ok(())
    }

    async fn list_scores(&self) -> anyhow::Result<Vec<EmployeeScore>> {
        let query = format!("SELECT {SCORE_COLUMNS} FROM taskflow.employee_scores");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(score_from_row).collect()
    }
}
