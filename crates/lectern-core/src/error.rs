use thiserror::Error;

use crate::ids::ObjectId;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0} not found: {1}")]
    NotFound(EntityKind, String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("User is not enrolled in course {0}")]
    NotEnrolled(ObjectId),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The graph store committed but the catalog write that should follow it did not.
    #[error("Catalog rating for course {course_id} diverges from the graph: {source}")]
    ConsistencyGap {
        course_id: ObjectId,
        #[source]
        source: StorageError,
    },
}

impl CoreError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        CoreError::NotFound(kind, id.to_string())
    }

    /// Coarse classification used by the request layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::NotFound(..) => ErrorKind::NotFound,
            CoreError::InvalidCredentials => ErrorKind::Auth,
            CoreError::Conflict(_) | CoreError::NotEnrolled(_) => ErrorKind::Conflict,
            CoreError::Storage(_) => ErrorKind::Store,
            CoreError::ConsistencyGap { .. } => ErrorKind::ConsistencyGap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Auth,
    Conflict,
    Store,
    ConsistencyGap,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Auth => "auth",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Store => "store",
            ErrorKind::ConsistencyGap => "consistency_gap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Course,
    Unit,
    Class,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::User => "User",
            EntityKind::Course => "Course",
            EntityKind::Unit => "Unit",
            EntityKind::Class => "Class",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid identifier {0:?}: expected 24 hex characters")]
    InvalidIdentifier(String),

    #[error("Invalid rating {0}: must be between 0 and 5")]
    RatingOutOfRange(f64),

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Review too short: {0} characters (min 15)")]
    ReviewTooShort(usize),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ConflictError {
    #[error("a profile for {0} already exists")]
    AlreadyRegistered(String),

    #[error("already enrolled in course {0}")]
    AlreadyEnrolled(ObjectId),

    #[error("class {0} already viewed")]
    AlreadyViewed(ObjectId),

    #[error("profile {0} was modified concurrently")]
    ConcurrentModification(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Record not found: {0}")]
    MissingRecord(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}
