use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use lectern_core::profile::email_from_key;
use lectern_core::{
    CatalogDocument, CatalogStore, Class, CoreError, Course, EdgeType, GraphStore, NodeRef, ObjectId,
    ProfileStore, Properties, Unit, UserProfile, PROFILE_KEY_PREFIX,
};

use crate::nodes::{class_node, course_node, user_node};

/// Counts from one `migrate_all` run. A re-run creates nothing.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub users_scanned: usize,
    pub users_created: usize,
    pub users_skipped: usize,
    pub courses_scanned: usize,
    pub courses_created: usize,
    pub classes_created: usize,
    pub classes_skipped: usize,
    /// Catalog documents that failed to decode.
    pub documents_skipped: usize,
}

/// Copies users, courses and the course/class structure into the graph.
///
/// Each pass runs in one graph transaction and only creates what is missing,
/// so the whole migration can be re-run at any time.
pub struct MigrationEngine<P, C, G>
where
    P: ProfileStore,
    C: CatalogStore,
    G: GraphStore,
{
    profiles: Arc<P>,
    catalog: Arc<C>,
    graph: Arc<G>,
}

impl<P, C, G> MigrationEngine<P, C, G>
where
    P: ProfileStore,
    C: CatalogStore,
    G: GraphStore,
{
    pub fn new(profiles: Arc<P>, catalog: Arc<C>, graph: Arc<G>) -> Self {
        Self {
            profiles,
            catalog,
            graph,
        }
    }

    pub fn migrate_all(&self) -> Result<MigrationReport, CoreError> {
        let mut report = MigrationReport::default();
        self.migrate_users(&mut report)?;
        self.migrate_courses(&mut report)?;
        self.migrate_classes(&mut report)?;

        tracing::info!(
            "Migration complete: {} users, {} courses, {} classes created",
            report.users_created,
            report.courses_created,
            report.classes_created
        );
        Ok(report)
    }

    fn migrate_users(&self, report: &mut MigrationReport) -> Result<(), CoreError> {
        let keys = self.profiles.keys(PROFILE_KEY_PREFIX)?;
        report.users_scanned = keys.len();

        let mut users: Vec<UserProfile> = Vec::with_capacity(keys.len());
        for key in &keys {
            if email_from_key(key).is_none() {
                tracing::warn!("Skipping profile key without an email: {:?}", key);
                report.users_skipped += 1;
                continue;
            }
            match self.profiles.get(key) {
                Ok(Some(profile)) => users.push(profile),
                Ok(None) => report.users_skipped += 1,
                Err(e) => {
                    tracing::warn!("Skipping unreadable profile {}: {}", key, e);
                    report.users_skipped += 1;
                }
            }
        }

        report.users_created = self.graph.write(|g| {
            let mut created = 0;
            for profile in &users {
                let (node, props) = user_node(profile);
                if g.create_node(&node, props)? {
                    created += 1;
                }
            }
            Ok::<_, CoreError>(created)
        })?;

        tracing::info!(
            "User pass: {} scanned, {} created",
            report.users_scanned,
            report.users_created
        );
        Ok(())
    }

    /// Decode every document of `D`'s collection, skipping the unreadable ones.
    fn readable_documents<D: CatalogDocument>(
        &self,
        report: &mut MigrationReport,
    ) -> Result<Vec<D>, CoreError> {
        let raw = self.catalog.documents(D::COLLECTION)?;
        let mut decoded = Vec::with_capacity(raw.len());
        for doc in raw {
            let id = doc.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
            match serde_json::from_value(doc) {
                Ok(document) => decoded.push(document),
                Err(e) => {
                    tracing::warn!(
                        "Skipping unreadable {} document {}: {}",
                        D::COLLECTION.name(),
                        id,
                        e
                    );
                    report.documents_skipped += 1;
                }
            }
        }
        Ok(decoded)
    }

    fn migrate_courses(&self, report: &mut MigrationReport) -> Result<(), CoreError> {
        let courses: Vec<Course> = self.readable_documents(report)?;
        report.courses_scanned = courses.len();

        report.courses_created = self.graph.write(|g| {
            let mut created = 0;
            for course in &courses {
                let (node, props) = course_node(course);
                if g.create_node(&node, props)? {
                    created += 1;
                }
            }
            Ok::<_, CoreError>(created)
        })?;

        tracing::info!(
            "Course pass: {} scanned, {} created",
            report.courses_scanned,
            report.courses_created
        );
        Ok(())
    }

    /// Class nodes plus `Course -[Contains]-> Class`, walked through the units.
    fn migrate_classes(&self, report: &mut MigrationReport) -> Result<(), CoreError> {
        let units: Vec<Unit> = self.readable_documents(report)?;
        let classes: HashMap<ObjectId, Class> = self
            .readable_documents::<Class>(report)?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let (created, skipped) = self.graph.write(|g| {
            let mut created = 0;
            let mut skipped = 0;
            for unit in &units {
                let course_ref = NodeRef::course(unit.course_id);
                if !g.node_exists(&course_ref)? {
                    tracing::warn!(
                        "Unit {} points at unknown course {}, skipping its classes",
                        unit.id,
                        unit.course_id
                    );
                    skipped += unit.classes.len();
                    continue;
                }

                for class_id in &unit.classes {
                    let Some(class) = classes.get(class_id) else {
                        tracing::warn!("Unit {} lists missing class {}", unit.id, class_id);
                        skipped += 1;
                        continue;
                    };
                    let (node, props) = class_node(class);
                    if g.create_node(&node, props)? {
                        created += 1;
                    }
                    g.merge_edge(&course_ref, &node, EdgeType::Contains, Properties::new())?;
                }
            }
            Ok::<_, CoreError>((created, skipped))
        })?;
        report.classes_created = created;
        report.classes_skipped = skipped;

        tracing::info!("Class pass: {} created, {} skipped", created, skipped);
        Ok(())
    }
}
