use std::sync::Arc;

use crate::config::Config;
use crate::ledger::{CreditLedger, TaskStore};
use crate::observability::Metrics;
use crate::tasks::{LifecycleEngine, TaskIntake};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<TaskStore>,
    pub credits: Arc<CreditLedger>,
    pub intake: Arc<TaskIntake>,
    pub engine: Arc<LifecycleEngine>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<TaskStore>,
        credits: Arc<CreditLedger>,
        intake: TaskIntake,
        engine: LifecycleEngine,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            credits,
            intake: Arc::new(intake),
            engine: Arc::new(engine),
            metrics,
        }
    }
}
