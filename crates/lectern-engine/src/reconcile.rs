use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;
use tokio::time::sleep;

use lectern_core::{
    Aggregation, CatalogStore, Collection, CoreError, EdgeType, GraphStore, NodeRef, ObjectId,
    COURSE_RATING_FIELD,
};

/// Courses whose catalog rating may lag behind the graph.
///
/// Each course carries a generation bumped on every `insert`. A repair only
/// clears the entry if no newer failure was recorded while it ran.
#[derive(Debug, Default)]
pub struct PendingRepairs {
    courses: DashMap<ObjectId, u64>,
}

impl PendingRepairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the course as lagging. Returns true if it was not pending before.
    pub fn insert(&self, course_id: ObjectId) -> bool {
        match self.courses.entry(course_id) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() += 1;
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(1);
                true
            }
        }
    }

    pub fn remove(&self, course_id: ObjectId) -> bool {
        self.courses.remove(&course_id).is_some()
    }

    /// Remove the course only if it is still at `generation`.
    fn settle(&self, course_id: ObjectId, generation: u64) -> bool {
        self.courses
            .remove_if(&course_id, |_, current| *current == generation)
            .is_some()
    }

    pub fn contains(&self, course_id: ObjectId) -> bool {
        self.courses.contains_key(&course_id)
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    fn snapshot(&self) -> Vec<(ObjectId, u64)> {
        self.courses
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }
}

/// Statistics from one reconcile pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReconcileStats {
    pub attempted: usize,
    pub repaired: usize,
    /// Courses no longer in the catalog; nothing left to repair.
    pub dropped: usize,
    pub failed: usize,
}

/// Rewrites catalog ratings from the graph for courses left behind by a failed
/// catalog write.
pub struct RatingReconciler<C, G>
where
    C: CatalogStore,
    G: GraphStore,
{
    catalog: Arc<C>,
    graph: Arc<G>,
    pending: Arc<PendingRepairs>,
}

impl<C, G> RatingReconciler<C, G>
where
    C: CatalogStore,
    G: GraphStore,
{
    pub fn new(catalog: Arc<C>, graph: Arc<G>, pending: Arc<PendingRepairs>) -> Self {
        Self {
            catalog,
            graph,
            pending,
        }
    }

    /// Try every pending course once. Failures stay pending, and so does a
    /// course that saw another failed catalog write while being repaired.
    pub fn reconcile_once(&self) -> ReconcileStats {
        let mut stats = ReconcileStats::default();

        for (course_id, generation) in self.pending.snapshot() {
            stats.attempted += 1;
            match self.repair(course_id) {
                Ok(true) => {
                    if self.pending.settle(course_id, generation) {
                        stats.repaired += 1;
                    } else {
                        stats.failed += 1;
                        tracing::debug!(
                            "Course {} was rated again during repair, keeping it pending",
                            course_id
                        );
                    }
                }
                Ok(false) => {
                    self.pending.settle(course_id, generation);
                    stats.dropped += 1;
                    tracing::warn!(
                        "Course {} vanished from the catalog, dropping repair",
                        course_id
                    );
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!("Failed to repair rating of course {}: {}", course_id, e);
                }
            }
        }

        stats
    }

    fn repair(&self, course_id: ObjectId) -> Result<bool, CoreError> {
        let average = self
            .graph
            .aggregate(
                EdgeType::Rated,
                &NodeRef::course(course_id),
                "value",
                Aggregation::Average,
            )?
            .unwrap_or(0.0);

        Ok(self.catalog.update_field(
            Collection::Courses,
            course_id,
            COURSE_RATING_FIELD,
            json!(average),
        )?)
    }

    /// Run the reconcile loop. Each pass runs on the blocking thread pool.
    pub async fn run(self: Arc<Self>, interval: Duration)
    where
        C: 'static,
        G: 'static,
    {
        loop {
            if !self.pending.is_empty() {
                let reconciler = self.clone();
                match tokio::task::spawn_blocking(move || reconciler.reconcile_once()).await {
                    Ok(stats) => tracing::info!(
                        "Reconciled {} of {} pending course ratings ({} failed)",
                        stats.repaired,
                        stats.attempted,
                        stats.failed
                    ),
                    Err(e) => tracing::error!("Reconcile pass aborted: {}", e),
                }
            }

            sleep(interval).await;
        }
    }
}
