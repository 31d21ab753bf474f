use std::sync::Arc;

use crate::{config::AppConfig, inference::InferenceService, mail::Mailer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub infer: Arc<InferenceService>,
    pub mailer: Arc<Mailer>,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let infer = Arc::new(InferenceService::new(config.inference.clone())?);
        let mailer = Arc::new(Mailer::new(config.smtp.clone()));

        Ok(Self {
            config: Arc::new(config),
            infer,
            mailer,
        })
    }
}
