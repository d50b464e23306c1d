use std::sync::Arc;

use lectern_core::CredentialHasher;
use lectern_db::{RedbCatalogStore, RedbGraphStore, RedbProfileStore, Stores};
use lectern_engine::{
    CommentCoordinator, EnrollmentManager, MigrationEngine, PendingRepairs, RatingCoordinator,
    RatingReconciler,
};

pub type Enrollment = EnrollmentManager<RedbProfileStore, RedbCatalogStore>;
pub type Ratings = RatingCoordinator<RedbProfileStore, RedbCatalogStore, RedbGraphStore>;
pub type Comments = CommentCoordinator<RedbProfileStore, RedbCatalogStore, RedbGraphStore>;
pub type Migration = MigrationEngine<RedbProfileStore, RedbCatalogStore, RedbGraphStore>;
pub type Reconciler = RatingReconciler<RedbCatalogStore, RedbGraphStore>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<RedbCatalogStore>,
    pub enrollment: Arc<Enrollment>,
    pub ratings: Arc<Ratings>,
    pub comments: Arc<Comments>,
    pub migration: Arc<Migration>,
    pub reconciler: Arc<Reconciler>,
    pub pending: Arc<PendingRepairs>,
}

impl AppState {
    pub fn new(stores: Stores) -> Self {
        Self::with_hasher(stores, CredentialHasher::default())
    }

    pub fn with_hasher(stores: Stores, hasher: CredentialHasher) -> Self {
        let profiles = Arc::new(stores.profiles);
        let catalog = Arc::new(stores.catalog);
        let graph = Arc::new(stores.graph);
        let pending = Arc::new(PendingRepairs::new());

        Self {
            enrollment: Arc::new(
                EnrollmentManager::new(profiles.clone(), catalog.clone()).with_hasher(hasher),
            ),
            ratings: Arc::new(RatingCoordinator::new(
                profiles.clone(),
                catalog.clone(),
                graph.clone(),
                pending.clone(),
            )),
            comments: Arc::new(CommentCoordinator::new(
                profiles.clone(),
                catalog.clone(),
                graph.clone(),
            )),
            migration: Arc::new(MigrationEngine::new(profiles, catalog.clone(), graph.clone())),
            reconciler: Arc::new(RatingReconciler::new(
                catalog.clone(),
                graph,
                pending.clone(),
            )),
            catalog,
            pending,
        }
    }
}
