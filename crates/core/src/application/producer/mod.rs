// Producer Service - validates, enriches and enqueues submitted tasks

pub mod submit;

pub use submit::SubmitRequest;

use crate::application::queue_engine::QueueEngine;
use crate::error::Result;
use crate::port::{IdProvider, TimeProvider};
use std::sync::Arc;

/// Producer Service
pub struct ProducerService {
    engine: QueueEngine,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ProducerService {
    pub fn new(
        engine: QueueEngine,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            engine,
            id_provider,
            time_provider,
        }
    }

    /// Submit a task to the pending queue, returning its ID
    pub async fn submit(&self, req: SubmitRequest) -> Result<String> {
        submit::execute(
            &self.engine,
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            req,
        )
        .await
    }
}
