use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ObjectId;

/// Key namespace for user profiles in the profile store.
pub const PROFILE_KEY_PREFIX: &str = "user:";

/// Profile store key for a user. Only the email is embedded, never a credential.
pub fn profile_key(email: &str) -> String {
    format!("{}{}", PROFILE_KEY_PREFIX, email)
}

/// Recover the email from a profile key.
pub fn email_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(PROFILE_KEY_PREFIX)
        .filter(|email| !email.is_empty())
}

/// A user record as stored in the profile store. Always written whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub progress: Vec<CourseProgress>,
    /// Bumped on every conditional write.
    #[serde(default)]
    pub version: u64,
}

impl UserProfile {
    pub fn new(email: String, name: String, password_hash: String) -> Self {
        Self {
            email,
            name,
            password_hash,
            enrollments: Vec::new(),
            progress: Vec::new(),
            version: 0,
        }
    }

    pub fn key(&self) -> String {
        profile_key(&self.email)
    }

    pub fn is_enrolled(&self, course_id: ObjectId) -> bool {
        self.enrollments.iter().any(|e| e.course_id == course_id)
    }

    pub fn enrolled_course_ids(&self) -> Vec<ObjectId> {
        self.enrollments.iter().map(|e| e.course_id).collect()
    }

    /// Record a new enrollment together with its fresh progress tracker.
    /// Returns false if the course is already enrolled.
    pub fn enroll(&mut self, course_id: ObjectId, at: DateTime<Utc>) -> bool {
        if self.is_enrolled(course_id) {
            return false;
        }
        self.enrollments.push(Enrollment {
            course_id,
            enrolled_at: at,
        });
        self.progress.push(CourseProgress::new(course_id));
        true
    }

    pub fn progress_for_mut(&mut self, course_id: ObjectId) -> Option<&mut CourseProgress> {
        self.progress.iter_mut().find(|p| p.course_id == course_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub course_id: ObjectId,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStatus {
    #[serde(rename = "INICIADO")]
    Started,
    #[serde(rename = "EN_CURSO")]
    InProgress,
    #[serde(rename = "COMPLETADO")]
    Completed,
}

impl ProgressStatus {
    /// Status as a pure function of viewed classes against the course total.
    /// A viewed count at or past the total counts as complete.
    pub fn from_counts(viewed: usize, total: usize) -> Self {
        if viewed == 0 {
            ProgressStatus::Started
        } else if viewed < total {
            ProgressStatus::InProgress
        } else {
            ProgressStatus::Completed
        }
    }
}

/// Per-course viewing progress embedded in a user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    pub course_id: ObjectId,
    pub viewed_classes: Vec<ObjectId>,
    pub status: ProgressStatus,
}

impl CourseProgress {
    pub fn new(course_id: ObjectId) -> Self {
        Self {
            course_id,
            viewed_classes: Vec::new(),
            status: ProgressStatus::Started,
        }
    }

    pub fn has_viewed(&self, class_id: ObjectId) -> bool {
        self.viewed_classes.contains(&class_id)
    }

    /// Append a viewed class and recompute the status against `total_classes`.
    /// Returns false if the class was already recorded.
    pub fn record_view(&mut self, class_id: ObjectId, total_classes: usize) -> bool {
        if self.has_viewed(class_id) {
            return false;
        }
        self.viewed_classes.push(class_id);
        self.status = ProgressStatus::from_counts(self.viewed_classes.len(), total_classes);
        true
    }
}

/// Public view of a profile, without credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub email: String,
    pub name: String,
    pub enrolled_courses: usize,
}

impl From<&UserProfile> for UserSummary {
    fn from(p: &UserProfile) -> Self {
        Self {
            email: p.email.clone(),
            name: p.name.clone(),
            enrolled_courses: p.enrollments.len(),
        }
    }
}
