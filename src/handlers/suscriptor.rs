use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    models::contenido::Categoria,
    models::suscriptor::{
        DesuscribirsePayload, PreferenciasPayload, SuscribirsePayload, Suscriptor,
    },
    state::AppState,
};

const COLUMNAS_SUSCRIPTOR: &str = "id, nombre, email, activo, token_desuscripcion, \
     fecha_suscripcion, suscrito_editorials, suscrito_issues, suscrito_madeinarg, \
     suscrito_news, suscrito_club_pompa";

// POST /api/suscriptores/suscribirse - endpoint público
pub async fn suscribirse_handler(
    State(state): State<AppState>,
    Json(payload): Json<SuscribirsePayload>,
) -> impl IntoResponse {
    let email = payload.email.trim().to_lowercase();
    let nombre = payload.nombre.trim().to_string();
    if nombre.is_empty() || !email.contains('@') {
        return (StatusCode::BAD_REQUEST, "Nombre o email inválido").into_response();
    }

    // ¿Existe ya un suscriptor con ese email?
    let existente = sqlx::query_as::<_, Suscriptor>(&format!(
        "SELECT {} FROM suscriptores WHERE email = $1",
        COLUMNAS_SUSCRIPTOR
    ))
    .bind(&email)
    .fetch_optional(&state.pool)
    .await;

    let existente = match existente {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Error buscando suscriptor: {:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response();
        }
    };

    if let Some(suscriptor) = existente {
        if suscriptor.activo {
            // Re-suscribirse ya activo no es un error fatal, solo un aviso
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Ya estás suscrito con este email" })),
            )
                .into_response();
        }

        // Reactivar la suscripción existente con las preferencias nuevas
        let result = sqlx::query(
            "UPDATE suscriptores \
             SET nombre = $1, activo = TRUE, fecha_suscripcion = NOW(), \
                 suscrito_editorials = $2, suscrito_issues = $3, suscrito_madeinarg = $4, \
                 suscrito_news = $5, suscrito_club_pompa = $6 \
             WHERE id = $7",
        )
        .bind(&nombre)
        .bind(payload.suscrito_editorials.unwrap_or(true))
        .bind(payload.suscrito_issues.unwrap_or(true))
        .bind(payload.suscrito_madeinarg.unwrap_or(true))
        .bind(payload.suscrito_news.unwrap_or(true))
        .bind(payload.suscrito_club_pompa.unwrap_or(true))
        .bind(suscriptor.id)
        .execute(&state.pool)
        .await;

        return match result {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": format!("¡Bienvenido de vuelta, {}! Tu suscripción ha sido reactivada.", nombre),
                    "suscriptor_id": suscriptor.id,
                })),
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Error reactivando suscriptor: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error al procesar suscripción").into_response()
            }
        };
    }

    // Alta nueva con token de desuscripción propio
    let token = Uuid::new_v4();
    let result = sqlx::query_scalar::<_, i64>(
        "INSERT INTO suscriptores \
             (nombre, email, token_desuscripcion, suscrito_editorials, suscrito_issues, \
              suscrito_madeinarg, suscrito_news, suscrito_club_pompa) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id",
    )
    .bind(&nombre)
    .bind(&email)
    .bind(token)
    .bind(payload.suscrito_editorials.unwrap_or(true))
    .bind(payload.suscrito_issues.unwrap_or(true))
    .bind(payload.suscrito_madeinarg.unwrap_or(true))
    .bind(payload.suscrito_news.unwrap_or(true))
    .bind(payload.suscrito_club_pompa.unwrap_or(true))
    .fetch_one(&state.pool)
    .await;

    match result {
        Ok(id) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "message": format!("¡Gracias por suscribirte, {}! Recibirás notificaciones sobre nuevo contenido.", nombre),
                "suscriptor_id": id,
                "token_desuscripcion": token.to_string(),
            })),
        )
            .into_response(),
        Err(e) => {
            // Carrera contra otra alta con el mismo email
            tracing::error!("Error creando suscriptor: {:?}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Ya estás suscrito con este email" })),
            )
                .into_response()
        }
    }
}

// POST /api/suscriptores/desuscribirse - por token, nunca borra la fila
pub async fn desuscribirse_handler(
    State(state): State<AppState>,
    Json(payload): Json<DesuscribirsePayload>,
) -> impl IntoResponse {
    let result = sqlx::query_as::<_, (String, String)>(
        "UPDATE suscriptores SET activo = FALSE \
         WHERE token_desuscripcion = $1 AND activo = TRUE \
         RETURNING nombre, email",
    )
    .bind(payload.token)
    .fetch_optional(&state.pool)
    .await;

    match result {
        Ok(Some((nombre, email))) => {
            if let Some(motivo) = payload.motivo.filter(|m| !m.trim().is_empty()) {
                tracing::info!("Desuscripción - {}: {}", email, motivo);
            }
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": format!("Te has desuscrito exitosamente, {}. Lamentamos verte partir.", nombre),
                })),
            )
                .into_response()
        }
        Ok(None) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Token de desuscripción inválido o ya utilizado" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error procesando desuscripción: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error al procesar desuscripción").into_response()
        }
    }
}

// POST /api/suscriptores/preferencias - actualizar opt-ins por token
pub async fn actualizar_preferencias_handler(
    State(state): State<AppState>,
    Json(payload): Json<PreferenciasPayload>,
) -> impl IntoResponse {
    // COALESCE: la preferencia que no vino queda como estaba
    let result = sqlx::query_as::<_, (bool, bool, bool, bool, bool)>(
        "UPDATE suscriptores SET \
             suscrito_editorials = COALESCE($2, suscrito_editorials), \
             suscrito_issues = COALESCE($3, suscrito_issues), \
             suscrito_madeinarg = COALESCE($4, suscrito_madeinarg), \
             suscrito_news = COALESCE($5, suscrito_news), \
             suscrito_club_pompa = COALESCE($6, suscrito_club_pompa) \
         WHERE token_desuscripcion = $1 \
         RETURNING suscrito_editorials, suscrito_issues, suscrito_madeinarg, \
                   suscrito_news, suscrito_club_pompa",
    )
    .bind(payload.token)
    .bind(payload.suscrito_editorials)
    .bind(payload.suscrito_issues)
    .bind(payload.suscrito_madeinarg)
    .bind(payload.suscrito_news)
    .bind(payload.suscrito_club_pompa)
    .fetch_optional(&state.pool)
    .await;

    match result {
        Ok(Some((editorials, issues, madeinarg, news, club_pompa))) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Preferencias actualizadas exitosamente",
                "preferencias": {
                    "editorials": editorials,
                    "issues": issues,
                    "madeinarg": madeinarg,
                    "news": news,
                    "club_pompa": club_pompa,
                }
            })),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Token inválido" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error actualizando preferencias: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error al actualizar preferencias").into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FiltroSuscriptores {
    pub activos: Option<bool>,
    pub categoria: Option<String>,
}

// GET /api/admin/suscriptores
pub async fn listar_suscriptores_handler(
    opts: Option<Query<FiltroSuscriptores>>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Query(opts) = opts.unwrap_or(Query(FiltroSuscriptores::default()));

    let categoria = match opts.categoria.as_deref() {
        None => None,
        Some(c) => match Categoria::parse(c) {
            Some(v) => Some(v),
            None => return (StatusCode::BAD_REQUEST, "Categoría inválida").into_response(),
        },
    };

    // El filtro por categoría usa la columna de opt-in correspondiente
    let filtro_categoria = categoria
        .map(|c| format!(" AND {} = TRUE", c.columna_suscripcion()))
        .unwrap_or_default();
    let sql = format!(
        "SELECT {} FROM suscriptores \
         WHERE ($1::bool IS NULL OR activo = $1){} \
         ORDER BY fecha_suscripcion DESC",
        COLUMNAS_SUSCRIPTOR, filtro_categoria
    );

    let result = sqlx::query_as::<_, Suscriptor>(&sql)
        .bind(opts.activos)
        .fetch_all(&state.pool)
        .await;

    match result {
        Ok(suscriptores) => (StatusCode::OK, Json(suscriptores)).into_response(),
        Err(e) => {
            tracing::error!("Error listando suscriptores: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response()
        }
    }
}

// GET /api/admin/suscriptores/estadisticas
pub async fn estadisticas_suscriptores_handler(
    State(state): State<AppState>,
) -> impl IntoResponse {
    let totales = sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE activo) FROM suscriptores",
    )
    .fetch_one(&state.pool)
    .await;

    let (total, activos) = match totales {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Error en estadísticas de suscriptores: {:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response();
        }
    };

    let mut por_categoria = serde_json::Map::new();
    for categoria in Categoria::TODAS {
        let sql = format!(
            "SELECT COUNT(*) FROM suscriptores WHERE activo = TRUE AND {} = TRUE",
            categoria.columna_suscripcion()
        );
        let count: i64 = match sqlx::query_scalar(&sql).fetch_one(&state.pool).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("Error contando suscriptores de {}: {:?}", categoria.as_str(), e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos")
                    .into_response();
            }
        };
        por_categoria.insert(
            categoria.as_str().to_string(),
            json!({ "nombre": categoria.nombre_display(), "total": count }),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "total_suscriptores": total,
            "total_activos": activos,
            "total_inactivos": total - activos,
            "suscripciones_por_categoria": por_categoria,
        })),
    )
        .into_response()
}
