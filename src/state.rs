use std::sync::Arc;

use crate::{config::AppConfig, engine::Evaluator, store::DeedStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DeedStore>,
    pub evaluator: Arc<dyn Evaluator>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DeedStore>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            evaluator,
        }
    }
}
