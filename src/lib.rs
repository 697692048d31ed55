//! Task submission, simulated code analysis, reviewer scoring and skill
//! leaderboards for an intern/employee review desk.

pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod lifecycle;
pub mod models;
pub mod queries;
pub mod report;
pub mod scoring;
pub mod seed;
pub mod service;
pub mod store;
pub mod tech;
pub mod validation;

pub use error::{DeskError, FieldError, InvalidStateTransition, ValidationError};
pub use service::ReviewDesk;
