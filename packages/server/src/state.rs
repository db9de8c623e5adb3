use std::sync::Arc;

use sea_orm::DatabaseConnection;

use trellis_common::storage::ObjectStore;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub objects: Arc<dyn ObjectStore>,
    pub config: Arc<AppConfig>,
}
