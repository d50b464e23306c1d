use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use lectern_core::graph::to_properties;
use lectern_core::{
    Aggregation, CatalogStore, Collection, CoreError, Course, Credentials, EdgeType, EntityKind,
    GraphStore, NodeRef, ObjectId, ProfileStore, Rating, StorageError, Validator,
    COURSE_RATING_FIELD,
};

use crate::nodes::{course_node, user_node};
use crate::reconcile::PendingRepairs;
use crate::session::authenticate;

/// Edge property holding the rating value.
const RATING_VALUE: &str = "value";

/// Result of a successful rating.
#[derive(Debug, Clone, Serialize)]
pub struct RatingOutcome {
    pub course_id: ObjectId,
    pub value: f64,
    /// New course average across all raters.
    pub average: f64,
    /// True if this user had rated the course before.
    pub replaced: bool,
}

/// Writes a rating to the graph, then mirrors the new average into the catalog.
///
/// The two writes are not atomic. If the catalog write fails after the graph
/// committed, the course goes into `PendingRepairs` for the reconciler and the
/// caller sees `CoreError::ConsistencyGap`.
pub struct RatingCoordinator<P, C, G>
where
    P: ProfileStore,
    C: CatalogStore,
    G: GraphStore,
{
    profiles: Arc<P>,
    catalog: Arc<C>,
    graph: Arc<G>,
    pending: Arc<PendingRepairs>,
}

impl<P, C, G> RatingCoordinator<P, C, G>
where
    P: ProfileStore,
    C: CatalogStore,
    G: GraphStore,
{
    pub fn new(
        profiles: Arc<P>,
        catalog: Arc<C>,
        graph: Arc<G>,
        pending: Arc<PendingRepairs>,
    ) -> Self {
        Self {
            profiles,
            catalog,
            graph,
            pending,
        }
    }

    pub fn create_rating(
        &self,
        course_id: &str,
        credentials: &Credentials,
        value: f64,
    ) -> Result<RatingOutcome, CoreError> {
        Validator::validate_rating(value)?;
        let course_id = Validator::validate_id(course_id)?;

        let profile = authenticate(&*self.profiles, credentials)?;
        if !profile.is_enrolled(course_id) {
            return Err(CoreError::NotEnrolled(course_id));
        }

        let course: Course = self
            .catalog
            .find_by_id(course_id)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Course, course_id))?;

        let rating = Rating {
            value,
            rated_at: Utc::now(),
            name: profile.name.clone(),
        };
        let (course_ref, course_props) = course_node(&course);
        let (user_ref, user_props) = user_node(&profile);

        let (replaced, average) = self.graph.write(|g| {
            g.create_node(&course_ref, course_props)?;
            g.create_node(&user_ref, user_props)?;
            let props = to_properties(&rating).map_err(StorageError::from)?;
            let created = g.merge_edge(&user_ref, &course_ref, EdgeType::Rated, props)?;
            let average = g
                .aggregate(EdgeType::Rated, &course_ref, RATING_VALUE, Aggregation::Average)?
                .unwrap_or(0.0);
            Ok::<_, CoreError>((!created, average))
        })?;

        // The graph has committed from here on.
        let written = self.catalog.update_field(
            Collection::Courses,
            course_id,
            COURSE_RATING_FIELD,
            json!(average),
        );
        let gap = match written {
            Ok(true) => None,
            Ok(false) => Some(StorageError::MissingRecord(format!("course {}", course_id))),
            Err(e) => Some(e),
        };
        if let Some(source) = gap {
            self.pending.insert(course_id);
            tracing::warn!(
                "Rating of course {} committed to the graph but not the catalog: {}",
                course_id,
                source
            );
            return Err(CoreError::ConsistencyGap { course_id, source });
        }

        tracing::info!(
            "{} rated course {} with {} (average {:.2})",
            profile.email,
            course_id,
            value,
            average
        );
        Ok(RatingOutcome {
            course_id,
            value,
            average,
            replaced,
        })
    }

    /// Current average from the graph. A course with no ratings averages 0.
    pub fn average_rating(&self, course_id: &str) -> Result<f64, CoreError> {
        let course_id = Validator::validate_id(course_id)?;
        Ok(self
            .graph
            .aggregate(
                EdgeType::Rated,
                &NodeRef::course(course_id),
                RATING_VALUE,
                Aggregation::Average,
            )?
            .unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Fixture;
    use crate::reconcile::RatingReconciler;
    use lectern_core::{
        InMemoryCatalogStore, InMemoryGraphStore, InMemoryProfileStore, ValidationError,
    };
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Catalog whose field updates can be switched to fail.
    struct FlakyCatalog {
        inner: Arc<InMemoryCatalogStore>,
        fail_updates: AtomicBool,
    }

    impl CatalogStore for FlakyCatalog {
        fn get_document(
            &self,
            collection: Collection,
            id: ObjectId,
        ) -> Result<Option<Value>, StorageError> {
            self.inner.get_document(collection, id)
        }

        fn put_document(
            &self,
            collection: Collection,
            id: ObjectId,
            document: Value,
        ) -> Result<(), StorageError> {
            self.inner.put_document(collection, id, document)
        }

        fn update_field(
            &self,
            collection: Collection,
            id: ObjectId,
            field: &str,
            value: Value,
        ) -> Result<bool, StorageError> {
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(StorageError::Database("catalog unavailable".to_string()));
            }
            self.inner.update_field(collection, id, field, value)
        }

        fn documents(&self, collection: Collection) -> Result<Vec<Value>, StorageError> {
            self.inner.documents(collection)
        }
    }

    fn coordinator(
        fx: &Fixture,
    ) -> RatingCoordinator<InMemoryProfileStore, InMemoryCatalogStore, InMemoryGraphStore> {
        RatingCoordinator::new(
            fx.profiles.clone(),
            fx.catalog.clone(),
            fx.graph.clone(),
            fx.pending.clone(),
        )
    }

    fn enrolled_user(fx: &Fixture, email: &str, course: &Course) -> Credentials {
        let creds = fx.register(email, "pw");
        fx.enrollment()
            .enroll(&creds, &course.id.to_hex())
            .unwrap();
        creds
    }

    #[test]
    fn test_average_over_users() {
        let fx = Fixture::new();
        let course = fx.seed_course("Rust", &[1]).course;
        let ratings = coordinator(&fx);

        let values = [4.0, 2.0, 3.0];
        for (i, value) in values.iter().enumerate() {
            let creds = enrolled_user(&fx, &format!("u{}@x.io", i), &course);
            ratings
                .create_rating(&course.id.to_hex(), &creds, *value)
                .unwrap();
        }

        assert_eq!(ratings.average_rating(&course.id.to_hex()).unwrap(), 3.0);
        let stored: Course = fx.catalog.find_by_id(course.id).unwrap().unwrap();
        assert_eq!(stored.rating, 3.0);
    }

    #[test]
    fn test_average_independent_of_order() {
        let mut averages = Vec::new();
        for order in [[4.5, 1.0, 2.5], [2.5, 4.5, 1.0], [1.0, 2.5, 4.5]] {
            let fx = Fixture::new();
            let course = fx.seed_course("Rust", &[1]).course;
            let ratings = coordinator(&fx);
            let mut last = None;
            for (i, value) in order.iter().enumerate() {
                let creds = enrolled_user(&fx, &format!("u{}@x.io", i), &course);
                last = Some(
                    ratings
                        .create_rating(&course.id.to_hex(), &creds, *value)
                        .unwrap()
                        .average,
                );
            }
            let stored: Course = fx.catalog.find_by_id(course.id).unwrap().unwrap();
            assert_eq!(last, Some(stored.rating));
            averages.push(stored.rating);
        }

        assert!(averages.iter().all(|avg| (avg - 8.0 / 3.0).abs() < 1e-9));
    }

    #[test]
    fn test_rerating_replaces_value() {
        let fx = Fixture::new();
        let course = fx.seed_course("Rust", &[1]).course;
        let ratings = coordinator(&fx);
        let creds = enrolled_user(&fx, "ana@x.io", &course);
        let id = course.id.to_hex();

        let first = ratings.create_rating(&id, &creds, 1.0).unwrap();
        assert!(!first.replaced);

        let second = ratings.create_rating(&id, &creds, 5.0).unwrap();
        assert!(second.replaced);
        assert_eq!(second.average, 5.0);
    }

    #[test]
    fn test_out_of_range_touches_nothing() {
        let fx = Fixture::new();
        let course = fx.seed_course("Rust", &[1]).course;
        let creds = enrolled_user(&fx, "ana@x.io", &course);
        let writes_before = fx.profiles.write_count();

        let err = coordinator(&fx)
            .create_rating(&course.id.to_hex(), &creds, 5.5)
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::RatingOutOfRange(_))
        ));
        assert_eq!(fx.profiles.write_count(), writes_before);
        assert_eq!(fx.graph.transaction_count(), 0);
        let stored: Course = fx.catalog.find_by_id(course.id).unwrap().unwrap();
        assert_eq!(stored.rating, 0.0);
    }

    #[test]
    fn test_not_enrolled_opens_no_graph_transaction() {
        let fx = Fixture::new();
        let course = fx.seed_course("Rust", &[1]).course;
        let creds = fx.register("ana@x.io", "pw");

        let err = coordinator(&fx)
            .create_rating(&course.id.to_hex(), &creds, 4.0)
            .unwrap_err();

        assert!(matches!(err, CoreError::NotEnrolled(id) if id == course.id));
        assert_eq!(fx.graph.transaction_count(), 0);
    }

    #[test]
    fn test_enrolled_but_missing_course() {
        let fx = Fixture::new();
        let creds = fx.register("ana@x.io", "pw");
        let ghost = ObjectId::generate();
        fx.enrollment().enroll(&creds, &ghost.to_hex()).unwrap();

        let err = coordinator(&fx)
            .create_rating(&ghost.to_hex(), &creds, 4.0)
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(EntityKind::Course, _)));
    }

    #[test]
    fn test_average_without_ratings() {
        let fx = Fixture::new();
        let avg = coordinator(&fx)
            .average_rating(&ObjectId::generate().to_hex())
            .unwrap();
        assert_eq!(avg, 0.0);
    }

    #[test]
    fn test_catalog_failure_is_reported_and_repaired() {
        let fx = Fixture::new();
        let course = fx.seed_course("Rust", &[1]).course;
        let creds = enrolled_user(&fx, "ana@x.io", &course);

        let flaky = Arc::new(FlakyCatalog {
            inner: fx.catalog.clone(),
            fail_updates: AtomicBool::new(true),
        });
        let ratings = RatingCoordinator::new(
            fx.profiles.clone(),
            flaky.clone(),
            fx.graph.clone(),
            fx.pending.clone(),
        );

        let err = ratings
            .create_rating(&course.id.to_hex(), &creds, 4.0)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::ConsistencyGap { course_id, .. } if course_id == course.id
        ));

        // Graph kept the rating; catalog did not
        assert_eq!(ratings.average_rating(&course.id.to_hex()).unwrap(), 4.0);
        let stale: Course = fx.catalog.find_by_id(course.id).unwrap().unwrap();
        assert_eq!(stale.rating, 0.0);
        assert!(fx.pending.contains(course.id));

        // Still failing: stays pending
        let reconciler =
            RatingReconciler::new(flaky.clone(), fx.graph.clone(), fx.pending.clone());
        assert_eq!(reconciler.reconcile_once().failed, 1);
        assert!(fx.pending.contains(course.id));

        flaky.fail_updates.store(false, Ordering::SeqCst);
        assert_eq!(reconciler.reconcile_once().repaired, 1);
        assert!(fx.pending.is_empty());

        let repaired: Course = fx.catalog.find_by_id(course.id).unwrap().unwrap();
        assert_eq!(repaired.rating, 4.0);
    }
}
