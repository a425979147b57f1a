use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errores del ciclo de guardado de contenido. Los de validación y secuencia
/// cortan la operación de forma síncrona; los fallos de imagen o de correo
/// nunca pasan por acá (se acumulan por ítem en sus servicios).
#[derive(Debug, Error)]
pub enum ContenidoError {
    #[error("{0}")]
    Validacion(String),
    #[error("Contenido no encontrado")]
    NoEncontrado,
    #[error("No se pudo asignar un número de issue único")]
    ConflictoSecuencia,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl IntoResponse for ContenidoError {
    fn into_response(self) -> Response {
        match self {
            ContenidoError::Validacion(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ContenidoError::NoEncontrado => {
                (StatusCode::NOT_FOUND, "Contenido no encontrado").into_response()
            }
            ContenidoError::ConflictoSecuencia => (
                StatusCode::BAD_REQUEST,
                "No se pudo asignar un número de issue único",
            )
                .into_response(),
            ContenidoError::Db(e) => {
                tracing::error!("Error de base de datos: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response()
            }
        }
    }
}

/// Devuelve true si el error de sqlx es una violación de unicidad (23505)
/// sobre la restricción indicada.
pub fn es_conflicto_unico(err: &sqlx::Error, restriccion: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23505")
                && db.constraint().map_or(false, |c| c == restriccion)
        }
        _ => false,
    }
}
