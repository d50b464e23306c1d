//! Lectern Engine - Coordinators keeping the profile, catalog and graph stores consistent.

pub mod comment;
pub mod enrollment;
pub mod migration;
pub mod rating;
pub mod reconcile;

mod nodes;
mod session;

#[cfg(test)]
mod fixtures;

pub use comment::CommentCoordinator;
pub use enrollment::EnrollmentManager;
pub use migration::{MigrationEngine, MigrationReport};
pub use rating::{RatingCoordinator, RatingOutcome};
pub use reconcile::{PendingRepairs, RatingReconciler, ReconcileStats};
