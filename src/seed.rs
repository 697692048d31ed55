use std::collections::BTreeSet;

use tracing::info;
use uuid::Uuid;

use crate::models::{Role, Team, User};
use crate::store::Repository;

pub const ADMIN_PRIYA: Uuid = Uuid::from_u128(0x6a1c_0001_0000_4000_8000_0000_0000_0001);
pub const ADMIN_MARCUS: Uuid = Uuid::from_u128(0x6a1c_0001_0000_4000_8000_0000_0000_0002);

pub const EMPLOYEE_ALICE: Uuid = Uuid::from_u128(0x6a1c_0002_0000_4000_8000_0000_0000_0001);
pub const EMPLOYEE_BEN: Uuid = Uuid::from_u128(0x6a1c_0002_0000_4000_8000_0000_0000_0002);
pub const EMPLOYEE_CHLOE: Uuid = Uuid::from_u128(0x6a1c_0002_0000_4000_8000_0000_0000_0003);
pub const EMPLOYEE_DEV: Uuid = Uuid::from_u128(0x6a1c_0002_0000_4000_8000_0000_0000_0004);
pub const EMPLOYEE_ELENA: Uuid = Uuid::from_u128(0x6a1c_0002_0000_4000_8000_0000_0000_0005);
pub const EMPLOYEE_FARID: Uuid = Uuid::from_u128(0x6a1c_0002_0000_4000_8000_0000_0000_0006);

pub const TEAM_BACKEND: Uuid = Uuid::from_u128(0x6a1c_0003_0000_4000_8000_0000_0000_0001);
pub const TEAM_FRONTEND: Uuid = Uuid::from_u128(0x6a1c_0003_0000_4000_8000_0000_0000_0002);
pub const TEAM_CLOUD: Uuid = Uuid::from_u128(0x6a1c_0003_0000_4000_8000_0000_0000_0003);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub teams: usize,
}

fn users() -> Vec<User> {
    let user = |id, name: &str, email: &str, role, team_id, designation: &str| User {
        id,
        name: name.to_string(),
        email: email.to_string(),
        role,
        team_id,
        designation: designation.to_string(),
    };
    vec![
        user(ADMIN_PRIYA, "Priya Sharma", "priya.sharma@taskflow.dev", Role::Admin, None, "Engineering Manager"),
        user(ADMIN_MARCUS, "Marcus Chen", "marcus.chen@taskflow.dev", Role::Admin, None, "Tech Lead"),
        user(EMPLOYEE_ALICE, "Alice Moreno", "alice.moreno@taskflow.dev", Role::Employee, Some(TEAM_BACKEND), "Backend Intern"),
        user(EMPLOYEE_BEN, "Ben Okafor", "ben.okafor@taskflow.dev", Role::Employee, Some(TEAM_BACKEND), "Backend Intern"),
        user(EMPLOYEE_CHLOE, "Chloe Park", "chloe.park@taskflow.dev", Role::Employee, Some(TEAM_FRONTEND), "Frontend Intern"),
        user(EMPLOYEE_DEV, "Dev Patel", "dev.patel@taskflow.dev", Role::Employee, Some(TEAM_FRONTEND), "Frontend Intern"),
        user(EMPLOYEE_ELENA, "Elena Rossi", "elena.rossi@taskflow.dev", Role::Employee, Some(TEAM_CLOUD), "Cloud Intern"),
        user(EMPLOYEE_FARID, "Farid Haddad", "farid.haddad@taskflow.dev", Role::Employee, Some(TEAM_CLOUD), "DevOps Intern"),
    ]
}

fn teams() -> Vec<Team> {
    let team = |id, name: &str, lead_id, members: &[Uuid], project: &str, description: &str| Team {
        id,
        name: name.to_string(),
        lead_id,
        member_ids: members.iter().copied().collect::<BTreeSet<_>>(),
        project: project.to_string(),
        description: description.to_string(),
    };
    vec![
        team(
            TEAM_BACKEND,
            "Backend Warriors",
            ADMIN_PRIYA,
            &[EMPLOYEE_ALICE, EMPLOYEE_BEN],
            "Inventory Management System",
            "Building the core backend services and APIs",
        ),
        team(
            TEAM_FRONTEND,
            "Frontend Avengers",
            ADMIN_MARCUS,
            &[EMPLOYEE_CHLOE, EMPLOYEE_DEV],
            "Customer Portal Redesign",
            "Redesigning the customer-facing web application",
        ),
        team(
            TEAM_CLOUD,
            "Cloud Ninjas",
            ADMIN_PRIYA,
            &[EMPLOYEE_ELENA, EMPLOYEE_FARID],
            "Infrastructure Migration",
            "Migrating on-premise infrastructure to cloud",
        ),
    ]
}

/// Inserts the starter users and teams. Entities that already exist are
/// left alone, so running it twice is harmless.
pub async fn seed(store: &dyn Repository) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for user in users() {
        if store.get_user(user.id).await?.is_none() {
            store.insert_user(&user).await?;
            summary.users += 1;
        }
    }
    for team in teams() {
        if store.get_team(team.id).await?.is_none() {
            store.insert_team(&team).await?;
            summary.teams += 1;
        }
    }

    info!(users = summary.users, teams = summary.teams, "seed data loaded");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn seeding_twice_inserts_once() {
        let store = MemoryStore::new();
        let first = seed(&store).await.unwrap();
        assert_eq!(first, SeedSummary { users: 8, teams: 3 });
        let second = seed(&store).await.unwrap();
        assert_eq!(second, SeedSummary::default());
    }

    #[test]
    fn every_member_belongs_to_its_team() {
        let users = users();
        for team in teams() {
            for member in &team.member_ids {
                let user = users.iter().find(|u| u.id == *member).unwrap();
                assert_eq!(user.team_id, Some(team.id));
                assert_eq!(user.role, Role::Employee);
            }
            let lead = users.iter().find(|u| u.id == team.lead_id).unwrap();
            assert_eq!(lead.role, Role::Admin);
        }
    }
}
