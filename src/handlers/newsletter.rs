use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::ContenidoError,
    models::contenido::Categoria,
    models::suscriptor::Newsletter,
    services::{contenido as contenido_srv, newsletter, newsletter::NewsletterError},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct FiltroNewsletters {
    pub categoria: Option<String>,
    pub exitoso: Option<bool>,
}

// GET /api/admin/newsletters
pub async fn listar_newsletters_handler(
    opts: Option<Query<FiltroNewsletters>>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Query(opts) = opts.unwrap_or(Query(FiltroNewsletters::default()));

    let categoria = match opts.categoria.as_deref() {
        None => None,
        Some(c) => match Categoria::parse(c) {
            Some(v) => Some(v.as_str().to_string()),
            None => return (StatusCode::BAD_REQUEST, "Categoría inválida").into_response(),
        },
    };

    let result = sqlx::query_as::<_, Newsletter>(
        "SELECT n.id, n.contenido_id, n.fecha_envio, n.enviado_exitosamente, \
                n.total_enviados, n.total_errores, n.log_errores \
         FROM newsletters n \
         JOIN contenidos c ON c.id = n.contenido_id \
         WHERE ($1::text IS NULL OR c.categoria = $1) \
           AND ($2::bool IS NULL OR n.enviado_exitosamente = $2) \
         ORDER BY n.fecha_envio DESC",
    )
    .bind(categoria)
    .bind(opts.exitoso)
    .fetch_all(&state.pool)
    .await;

    match result {
        Ok(newsletters) => (StatusCode::OK, Json(newsletters)).into_response(),
        Err(e) => {
            tracing::error!("Error listando newsletters: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response()
        }
    }
}

// POST /api/admin/newsletters/:id/reenviar - lote nuevo completo, solo si el
// original tuvo errores
pub async fn reenviar_newsletter_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let original = sqlx::query_as::<_, Newsletter>(
        "SELECT id, contenido_id, fecha_envio, enviado_exitosamente, \
                total_enviados, total_errores, log_errores \
         FROM newsletters WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await;

    let original = match original {
        Ok(Some(n)) => n,
        Ok(None) => return (StatusCode::NOT_FOUND, "Newsletter no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Error buscando newsletter {}: {:?}", id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response();
        }
    };

    if original.total_errores == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Este newsletter no tuvo errores en el envío" })),
        )
            .into_response();
    }

    let contenido = match contenido_srv::buscar_por_id(&state.pool, original.contenido_id).await {
        Ok(c) => c,
        Err(ContenidoError::NoEncontrado) => {
            return (StatusCode::NOT_FOUND, "Contenido no encontrado").into_response()
        }
        Err(e) => return e.into_response(),
    };

    match newsletter::reenviar(
        &state.pool,
        state.mailer.as_ref(),
        &state.config,
        id,
        &contenido,
    )
    .await
    {
        Ok(resultado) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Newsletter reenviado",
                "enviados": resultado.enviados,
                "errores": resultado.errores,
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error reenviando newsletter {}: {:?}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error al reenviar").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EnvioManualPayload {
    pub contenido_id: i64,
}

// POST /api/admin/newsletters/enviar-manual - para contenidos sin newsletter
pub async fn enviar_manual_handler(
    State(state): State<AppState>,
    Json(payload): Json<EnvioManualPayload>,
) -> impl IntoResponse {
    let contenido = match contenido_srv::buscar_por_id(&state.pool, payload.contenido_id).await {
        Ok(c) => c,
        Err(ContenidoError::NoEncontrado) => {
            return (StatusCode::NOT_FOUND, "Contenido no encontrado").into_response()
        }
        Err(e) => return e.into_response(),
    };

    match newsletter::despachar_manual(
        &state.pool,
        state.mailer.as_ref(),
        &state.config,
        &contenido,
    )
    .await
    {
        Ok((newsletter_id, resultado)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Newsletter enviado",
                "newsletter_id": newsletter_id,
                "enviados": resultado.enviados,
                "errores": resultado.errores,
            })),
        )
            .into_response(),
        Err(NewsletterError::YaEnviado) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Ya se envió newsletter para este contenido" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(
                "Error en envío manual para contenido {}: {:?}",
                payload.contenido_id,
                e
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Error al enviar newsletter").into_response()
        }
    }
}
