//! Shared setup for engine tests.

use std::sync::Arc;

use lectern_core::{
    CatalogStore, Class, Course, CredentialHasher, Credentials, InMemoryCatalogStore,
    InMemoryGraphStore, InMemoryProfileStore, Unit,
};

use crate::enrollment::EnrollmentManager;
use crate::reconcile::PendingRepairs;

#[derive(Clone)]
pub(crate) struct Fixture {
    pub profiles: Arc<InMemoryProfileStore>,
    pub catalog: Arc<InMemoryCatalogStore>,
    pub graph: Arc<InMemoryGraphStore>,
    pub pending: Arc<PendingRepairs>,
}

/// A course and its classes, as inserted into the catalog.
pub(crate) struct SeededCourse {
    pub course: Course,
    pub classes: Vec<Class>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(InMemoryProfileStore::new()),
            catalog: Arc::new(InMemoryCatalogStore::new()),
            graph: Arc::new(InMemoryGraphStore::new()),
            pending: Arc::new(PendingRepairs::new()),
        }
    }

    pub fn enrollment(&self) -> EnrollmentManager<InMemoryProfileStore, InMemoryCatalogStore> {
        EnrollmentManager::new(self.profiles.clone(), self.catalog.clone())
            .with_hasher(CredentialHasher::insecure_fast())
    }

    pub fn register(&self, email: &str, password: &str) -> Credentials {
        self.enrollment()
            .register("Ana", email, password)
            .unwrap();
        Credentials::new(email, password)
    }

    /// Insert a course with one unit per entry, each holding that many classes.
    pub fn seed_course(&self, name: &str, unit_sizes: &[usize]) -> SeededCourse {
        let mut course = Course::new(name, format!("{} description", name));
        let mut classes = Vec::new();

        for (i, size) in unit_sizes.iter().enumerate() {
            let mut unit = Unit::new(course.id, format!("Unit {}", i + 1));
            for j in 0..*size {
                let class = Class::new(unit.id, format!("Class {}.{}", i + 1, j + 1));
                unit.classes.push(class.id);
                self.catalog.insert(&class).unwrap();
                classes.push(class);
            }
            course.units.push(unit.id);
            self.catalog.insert(&unit).unwrap();
        }
        self.catalog.insert(&course).unwrap();

        SeededCourse { course, classes }
    }
}
