pub mod health;
pub mod performances;
pub mod personal_bests;
pub mod scores;

use std::sync::Arc;

use tokio::sync::RwLock;

use perf_tracker::services::collection::PerfCollection;
use perf_tracker::services::scoring::ScoringTable;
use perf_tracker::store::file::PerfStore;

use crate::errors::AppError;

/// Everything the handlers share: the collection, its backing file and the
/// scoring table.
pub struct TrackerState {
    pub collection: PerfCollection,
    pub store: PerfStore,
    pub scoring: ScoringTable,
}

impl TrackerState {
    /// Run `change` on a copy of the collection and persist the copy. The
    /// shared collection is replaced only once the save succeeded, so a
    /// failed request leaves memory and disk as they were.
    pub(crate) fn apply<T>(
        &mut self,
        change: impl FnOnce(&mut PerfCollection, &ScoringTable) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut candidate = self.collection.clone();
        let outcome = change(&mut candidate, &self.scoring)?;
        self.store.save(&candidate)?;
        self.collection = candidate;
        Ok(outcome)
    }
}

/// Writers take the lock exclusively, so mutations never interleave.
pub type SharedState = Arc<RwLock<TrackerState>>;
