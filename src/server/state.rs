use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::postgres::PostgresPool;
use crate::template::{Renderer, TemplateRepository, TemplateService};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub service: TemplateService,
    pub postgres_pool: Option<Arc<PostgresPool>>,
    pub start_time: Instant,
}

impl AppState {
    /// Build the state around an already selected store.
    ///
    /// The renderer is created once here and shared by every request.
    pub fn new(
        settings: Settings,
        store: Arc<dyn TemplateRepository>,
        postgres_pool: Option<Arc<PostgresPool>>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            service: TemplateService::new(store, Renderer::new()),
            postgres_pool,
            start_time: Instant::now(),
        }
    }
}
