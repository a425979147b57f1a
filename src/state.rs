use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::imgbb::ImgbbClient;
use crate::services::mailer::Mailer;

/// Estado compartido entre handlers: pool, configuración y colaboradores
/// externos (host de imágenes y transporte de correo).
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<AppConfig>,
    pub imgbb: Arc<ImgbbClient>,
    pub mailer: Arc<dyn Mailer>,
}
