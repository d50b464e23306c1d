//! Lectern Core - Domain models, store traits, and validation.
//!
//! This crate defines the records kept in the profile, catalog and graph
//! stores and the traits those stores implement. It has no dependencies on
//! other Lectern crates.

pub mod catalog;
pub mod credentials;
pub mod error;
pub mod graph;
pub mod ids;
pub mod profile;
pub mod storage;
pub mod validation;

// Re-exports for convenience
pub use catalog::{CatalogDocument, Class, Collection, Course, Unit, COURSE_RATING_FIELD};
pub use credentials::{CredentialHasher, Credentials};
pub use error::{ConflictError, CoreError, EntityKind, ErrorKind, StorageError, ValidationError};
pub use graph::{
    Aggregation, Comment, CourseReview, Edge, EdgeType, Node, NodeLabel, NodeRef, Properties,
    Rating, ReviewEdge,
};
pub use ids::ObjectId;
pub use profile::{
    profile_key, CourseProgress, Enrollment, ProgressStatus, UserProfile, UserSummary,
    PROFILE_KEY_PREFIX,
};
pub use storage::{CatalogStore, GraphRead, GraphStore, GraphWrite, ProfileStore};
pub use validation::Validator;

#[cfg(any(test, feature = "test-utils"))]
pub use storage::memory::{InMemoryCatalogStore, InMemoryGraphStore, InMemoryProfileStore};
