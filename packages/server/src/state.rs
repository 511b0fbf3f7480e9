use std::sync::Arc;

use storage::FileStore;

use crate::config::AppConfig;
use crate::repository::AssetRepository;

#[derive(Clone)]
pub struct AppState {
    pub assets: Arc<dyn AssetRepository>,
    pub files: Arc<dyn FileStore>,
    pub config: AppConfig,
}
