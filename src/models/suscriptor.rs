use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::contenido::Categoria;

// Lo que guardamos de cada suscriptor del newsletter. Se desactiva con
// `activo = false`, nunca se borra la fila.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Suscriptor {
    pub id: i64,
    pub nombre: String,
    pub email: String,
    pub activo: bool,
    #[serde(skip)] // El token solo viaja en el mail de cada suscriptor
    pub token_desuscripcion: Uuid,
    pub fecha_suscripcion: DateTime<Utc>,
    pub suscrito_editorials: bool,
    pub suscrito_issues: bool,
    pub suscrito_madeinarg: bool,
    pub suscrito_news: bool,
    pub suscrito_club_pompa: bool,
}

impl Suscriptor {
    pub fn esta_suscrito_a(&self, categoria: Categoria) -> bool {
        match categoria {
            Categoria::Editorials => self.suscrito_editorials,
            Categoria::Issues => self.suscrito_issues,
            Categoria::Madeinarg => self.suscrito_madeinarg,
            Categoria::News => self.suscrito_news,
            Categoria::ClubPompa => self.suscrito_club_pompa,
        }
    }
}

// Alta pública: nombre + email + preferencias opcionales (default: todas)
#[derive(Debug, Deserialize)]
pub struct SuscribirsePayload {
    pub nombre: String,
    pub email: String,
    pub suscrito_editorials: Option<bool>,
    pub suscrito_issues: Option<bool>,
    pub suscrito_madeinarg: Option<bool>,
    pub suscrito_news: Option<bool>,
    pub suscrito_club_pompa: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DesuscribirsePayload {
    pub token: Uuid,
    pub motivo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PreferenciasPayload {
    pub token: Uuid,
    pub suscrito_editorials: Option<bool>,
    pub suscrito_issues: Option<bool>,
    pub suscrito_madeinarg: Option<bool>,
    pub suscrito_news: Option<bool>,
    pub suscrito_club_pompa: Option<bool>,
}

/// Un lote de envío atado al evento de publicación de un contenido.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Newsletter {
    pub id: i64,
    pub contenido_id: i64,
    pub fecha_envio: DateTime<Utc>,
    pub enviado_exitosamente: bool,
    pub total_enviados: i32,
    pub total_errores: i32,
    pub log_errores: Option<String>,
}
