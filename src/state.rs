use std::sync::Arc;

use crate::{
    config::AppConfig,
    intake::FileIntake,
    storage::FileStorage,
    store::{ContentStore, SurveyStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub content: Arc<ContentStore>,
    pub surveys: Arc<SurveyStore>,
    pub intake: FileIntake,
    pub storage: Arc<dyn FileStorage>,
}

impl AppState {
    pub fn new(config: AppConfig, storage: Arc<dyn FileStorage>) -> Self {
        Self {
            config: Arc::new(config),
            content: Arc::new(ContentStore::new()),
            surveys: Arc::new(SurveyStore::new()),
            intake: FileIntake::new(storage.clone()),
            storage,
        }
    }
}
