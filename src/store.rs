//! Storage seam for the review desk.
//!
//! [`Repository`] is what the business logic talks to. [`MemoryStore`] keeps
//! everything in process memory; [`crate::db::PgStore`] persists to Postgres.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Analysis, EmployeeScore, Review, Task, TaskFilter, Team, User};

#[async_trait]
pub trait Repository: Send + Sync {
    async fn insert_user(&self, user: &User) -> anyhow::Result<()>;
    async fn update_user(&self, user: &User) -> anyhow::Result<()>;
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;

    async fn insert_team(&self, team: &Team) -> anyhow::Result<()>;
    async fn update_team(&self, team: &Team) -> anyhow::Result<()>;
    async fn get_team(&self, id: Uuid) -> anyhow::Result<Option<Team>>;
    async fn list_teams(&self) -> anyhow::Result<Vec<Team>>;

    async fn insert_task(&self, task: &Task) -> anyhow::Result<()>;
    async fn update_task(&self, task: &Task) -> anyhow::Result<()>;
    async fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>>;
    /// Unordered; callers sort.
    async fn list_tasks(&self, filter: &TaskFilter) -> anyhow::Result<Vec<Task>>;

    async fn insert_analysis(&self, analysis: &Analysis) -> anyhow::Result<()>;
    async fn analysis_for_task(&self, task_id: Uuid) -> anyhow::Result<Option<Analysis>>;

    async fn insert_review(&self, review: &Review) -> anyhow::Result<()>;
    async fn review_for_task(&self, task_id: Uuid) -> anyhow::Result<Option<Review>>;
    async fn list_reviews(&self) -> anyhow::Result<Vec<Review>>;

    async fn get_score(&self, employee_id: Uuid) -> anyhow::Result<Option<EmployeeScore>>;
    /// Inserts or replaces the aggregate for `score.employee_id`.
    async fn save_score(&self, score: &EmployeeScore) -> anyhow::Result<()>;
    async fn list_scores(&self) -> anyhow::Result<Vec<EmployeeScore>>;
}

pub trait Entity: Clone {
    const KIND: &'static str;

    fn id(&self) -> Uuid;
}

impl Entity for User {
    const KIND: &'static str = "user";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Team {
    const KIND: &'static str = "team";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Task {
    const KIND: &'static str = "task";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Analysis {
    const KIND: &'static str = "analysis";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Review {
    const KIND: &'static str = "review";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for EmployeeScore {
    const KIND: &'static str = "employee score";

    fn id(&self) -> Uuid {
        self.employee_id
    }
}

/// Insertion-ordered collection with id lookup.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> Collection<T> {
    pub fn insert(&mut self, item: T) -> anyhow::Result<()> {
        let id = item.id();
        if self.find_by_id(id).is_some() {
            anyhow::bail!("{} {id} already exists", T::KIND);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn filter<P>(&self, predicate: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        self.items.iter().filter(|item| predicate(item)).cloned().collect()
    }

    pub fn replace(&mut self, item: T) -> anyhow::Result<()> {
        let id = item.id();
        match self.items.iter_mut().find(|existing| existing.id() == id) {
            Some(existing) => {
                *existing = item;
                Ok(())
            }
            None => anyhow::bail!("{} {id} does not exist", T::KIND),
        }
    }

    pub fn upsert(&mut self, item: T) {
        let id = item.id();
        match self.items.iter_mut().find(|existing| existing.id() == id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    pub fn all(&self) -> Vec<T> {
        self.items.clone()
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Collection<User>,
    teams: Collection<Team>,
    tasks: Collection<Task>,
    analyses: Collection<Analysis>,
    reviews: Collection<Review>,
    scores: Collection<EmployeeScore>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn insert_user(&self, user: &User) -> anyhow::Result<()> {
        self.tables.write().await.users.insert(user.clone())
    }

    async fn update_user(&self, user: &User) -> anyhow::Result<()> {
        self.tables.write().await.users.replace(user.clone())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.tables.read().await.users.find_by_id(id).cloned())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.tables.read().await.users.all())
    }

    async fn insert_team(&self, team: &Team) -> anyhow::Result<()> {
        self.tables.write().await.teams.insert(team.clone())
    }

    async fn update_team(&self, team: &Team) -> anyhow::Result<()> {
        self.tables.write().await.teams.replace(team.clone())
    }

    async fn get_team(&self, id: Uuid) -> anyhow::Result<Option<Team>> {
        Ok(self.tables.read().await.teams.find_by_id(id).cloned())
    }

    async fn list_teams(&self) -> anyhow::Result<Vec<Team>> {
        Ok(self.tables.read().await.teams.all())
    }

    async fn insert_task(&self, task: &Task) -> anyhow::Result<()> {
        self.tables.write().await.tasks.insert(task.clone())
    }

    async fn update_task(&self, task: &Task) -> anyhow::Result<()> {
        self.tables.write().await.tasks.replace(task.clone())
    }

    async fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        Ok(self.tables.read().await.tasks.find_by_id(id).cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> anyhow::Result<Vec<Task>> {
        Ok(self.tables.read().await.tasks.filter(|task| filter.matches(task)))
    }

    async fn insert_analysis(&self, analysis: &Analysis) -> anyhow::Result<()> {
        let mut tables = self.tables.write().await;
        let task_id = analysis.task_id;
        if !tables.analyses.filter(|a| a.task_id == task_id).is_empty() {
            anyhow::bail!("task {task_id} already has an analysis");
        }
        tables.analyses.insert(analysis.clone())
    }

    async fn analysis_for_task(&self, task_id: Uuid) -> anyhow::Result<Option<Analysis>> {
        Ok(self
            .tables
            .read()
            .await
            .analyses
            .filter(|a| a.task_id == task_id)
            .into_iter()
            .next())
    }

    async fn insert_review(&self, review: &Review) -> anyhow::Result<()> {
        let mut tables = self.tables.write().await;
        let task_id = review.task_id;
        if !tables.reviews.filter(|r| r.task_id == task_id).is_empty() {
            anyhow::bail!("task {task_id} already has a review");
        }
        tables.reviews.insert(review.clone())
    }

    async fn review_for_task(&self, task_id: Uuid) -> anyhow::Result<Option<Review>> {
        Ok(self
            .tables
            .read()
            .await
            .reviews
            .filter(|r| r.task_id == task_id)
            .into_iter()
            .next())
    }

    async fn list_reviews(&self) -> anyhow::Result<Vec<Review>> {
        Ok(self.tables.read().await.reviews.all())
    }

    async fn get_score(&self, employee_id: Uuid) -> anyhow::Result<Option<EmployeeScore>> {
        Ok(self.tables.read().await.scores.find_by_id(employee_id).cloned())
    }

    async fn save_score(&self, score: &EmployeeScore) -> anyhow::Result<()> {
        self.tables.write().await.scores.upsert(score.clone());
        Ok(())
    }

    async fn list_scores(&self) -> anyhow::Result<Vec<EmployeeScore>> {
        Ok(self.tables.read().await.scores.all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role: Role::Employee,
            team_id: None,
            designation: "Intern".to_string(),
        }
    }

    #[test]
    fn collection_rejects_duplicate_ids() {
        let mut users = Collection::default();
        let avery = user("Avery");
        users.insert(avery.clone()).unwrap();
        assert!(users.insert(avery.clone()).is_err());
        assert_eq!(users.find_by_id(avery.id), Some(&avery));
    }

    #[test]
    fn collection_filter_keeps_insertion_order() {
        let mut users = Collection::default();
        for name in ["Avery", "Jules", "Kiara"] {
            users.insert(user(name)).unwrap();
        }
        let names: Vec<String> = users
            .filter(|u| u.name != "Jules")
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Avery", "Kiara"]);
    }

    #[test]
    fn replace_requires_existing_entity() {
        let mut users = Collection::default();
        assert!(users.replace(user("Avery")).is_err());
    }

    #[tokio::test]
    async fn memory_store_keeps_one_review_per_task() {
        let store = MemoryStore::new();
        let task_id = Uuid::new_v4();
        let review = Review {
            id: Uuid::new_v4(),
            task_id,
            admin_id: Uuid::new_v4(),
            feedback: "Good".to_string(),
            scores: Default::default(),
            decision: crate::models::Decision::Completed,
            reviewed_at: chrono::Utc::now(),
        };
        store.insert_review(&review).await.unwrap();

        let second = Review {
            id: Uuid::new_v4(),
            ..review.clone()
        };
        assert!(store.insert_review(&second).await.is_err());
        assert_eq!(store.review_for_task(task_id).await.unwrap(), Some(review));
    }

    #[tokio::test]
    async fn save_score_upserts() {
        let store = MemoryStore::new();
        let mut score = EmployeeScore::empty(Uuid::new_v4());
        store.save_score(&score).await.unwrap();
        score.total_tasks_completed = 3;
        store.save_score(&score).await.unwrap();

        let scores = store.list_scores().await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].total_tasks_completed, 3);
    }
}
