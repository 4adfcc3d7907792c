//! Shared state handed to every request handler.

use std::sync::Arc;

use super::pool::CollaboratorPool;
use crate::config::{RetrievalConfig, Settings};
use crate::services::Services;

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub pool: CollaboratorPool,
    pub retrieval: RetrievalConfig,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(services: Services, settings: &Settings) -> Self {
        Self {
            services: Arc::new(services),
            pool: CollaboratorPool::new(settings.server.worker_threads),
            retrieval: settings.retrieval.clone(),
            max_upload_bytes: settings.server.max_upload_bytes,
        }
    }
}
