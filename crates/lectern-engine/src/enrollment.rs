use std::sync::Arc;

use chrono::Utc;

use lectern_core::{
    CatalogStore, Class, ConflictError, CoreError, Course, CourseProgress, CredentialHasher,
    Credentials, Enrollment, EntityKind, ObjectId, ProfileStore, Unit, UserProfile, UserSummary,
    Validator, PROFILE_KEY_PREFIX,
};

use crate::session::{authenticate, write_back};

/// Owns user profiles: registration, enrollments and per-course viewing progress.
///
/// Every mutation reads the whole profile, changes it in memory and writes it
/// back conditionally on the version it was read at.
pub struct EnrollmentManager<P, C>
where
    P: ProfileStore,
    C: CatalogStore,
{
    profiles: Arc<P>,
    catalog: Arc<C>,
    hasher: CredentialHasher,
}

impl<P, C> EnrollmentManager<P, C>
where
    P: ProfileStore,
    C: CatalogStore,
{
    pub fn new(profiles: Arc<P>, catalog: Arc<C>) -> Self {
        Self {
            profiles,
            catalog,
            hasher: CredentialHasher::default(),
        }
    }

    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Create a new profile. The password is stored only as an Argon2id hash.
    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserSummary, CoreError> {
        Validator::validate_non_empty("name", name)?;
        Validator::validate_email(email)?;
        Validator::validate_non_empty("password", password)?;

        let profile = UserProfile::new(
            email.to_string(),
            name.trim().to_string(),
            self.hasher.hash(password)?,
        );

        // Version 0 means "absent", so a second registration loses the race.
        if !self.profiles.put_if_version(&profile.key(), &profile, 0)? {
            return Err(ConflictError::AlreadyRegistered(email.to_string()).into());
        }

        tracing::info!("Registered user {}", email);
        Ok(UserSummary::from(&profile))
    }

    pub fn list_users(&self) -> Result<Vec<UserSummary>, CoreError> {
        let mut users = Vec::new();
        for key in self.profiles.keys(PROFILE_KEY_PREFIX)? {
            if let Some(profile) = self.profiles.get(&key)? {
                users.push(UserSummary::from(&profile));
            }
        }
        Ok(users)
    }

    /// Enroll the caller in a course. Catalog existence of the course is not checked.
    pub fn enroll(
        &self,
        credentials: &Credentials,
        course_id: &str,
    ) -> Result<Enrollment, CoreError> {
        let course_id = Validator::validate_id(course_id)?;
        let mut profile = authenticate(&*self.profiles, credentials)?;

        let now = Utc::now();
        if !profile.enroll(course_id, now) {
            return Err(ConflictError::AlreadyEnrolled(course_id).into());
        }
        write_back(&*self.profiles, &profile)?;

        tracing::info!("Enrolled {} in course {}", profile.email, course_id);
        Ok(Enrollment {
            course_id,
            enrolled_at: now,
        })
    }

    /// Catalog documents of every enrolled course. Courses missing from the catalog are skipped.
    pub fn enrolled_courses(&self, credentials: &Credentials) -> Result<Vec<Course>, CoreError> {
        let profile = authenticate(&*self.profiles, credentials)?;
        Ok(self
            .catalog
            .find_many_by_ids(&profile.enrolled_course_ids())?)
    }

    /// Record that the caller watched a class and recompute the course status.
    pub fn mark_class_viewed(
        &self,
        credentials: &Credentials,
        class_id: &str,
    ) -> Result<CourseProgress, CoreError> {
        let class_id = Validator::validate_id(class_id)?;
        let mut profile = authenticate(&*self.profiles, credentials)?;

        let class: Class = self
            .catalog
            .find_by_id(class_id)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Class, class_id))?;
        let unit: Unit = self
            .catalog
            .find_by_id(class.unit_id)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Unit, class.unit_id))?;
        let course_id = unit.course_id;

        match profile.progress.iter().find(|p| p.course_id == course_id) {
            None => return Err(CoreError::NotEnrolled(course_id)),
            Some(progress) if progress.has_viewed(class_id) => {
                return Err(ConflictError::AlreadyViewed(class_id).into())
            }
            Some(_) => {}
        }

        let total = self.total_classes(course_id)?;
        let progress = profile
            .progress_for_mut(course_id)
            .ok_or(CoreError::NotEnrolled(course_id))?;
        progress.record_view(class_id, total);
        let updated = progress.clone();

        write_back(&*self.profiles, &profile)?;
        Ok(updated)
    }

    pub fn progress(&self, credentials: &Credentials) -> Result<Vec<CourseProgress>, CoreError> {
        Ok(authenticate(&*self.profiles, credentials)?.progress)
    }

    /// Number of classes across every unit of the course.
    fn total_classes(&self, course_id: ObjectId) -> Result<usize, CoreError> {
        let course: Course = self
            .catalog
            .find_by_id(course_id)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Course, course_id))?;
        let units: Vec<Unit> = self.catalog.find_many_by_ids(&course.units)?;
        Ok(units.iter().map(|u| u.classes.len()).sum())
    }
}
