use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::ContenidoError,
    models::contenido::{
        ActualizarContenidoPayload, Categoria, Contenido, ContenidoRow, CrearContenidoPayload,
        EstadoPublicacion, COLUMNAS_CONTENIDO,
    },
    models::user::{Claims, ROL_ADMIN},
    services::{contenido as contenido_srv, media, newsletter, visitas},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct FilterOptions {
    pub categoria: Option<String>,
    pub estado: Option<String>,
    pub subcategoria: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

// Limitar entre 1 y 100
fn limite(valor: Option<i64>, default: i64) -> i64 {
    valor.unwrap_or(default).clamp(1, 100)
}

/// El detalle acepta `:id` pelado o el formato SEO `id-slug`.
fn parsear_id(param: &str) -> Option<i64> {
    param.split('-').next().and_then(|p| p.parse().ok())
}

/// IP del cliente: primero X-Forwarded-For (proxy), si no la conexión directa.
fn ip_del_cliente(headers: &HeaderMap, addr: &SocketAddr) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(primera) = forwarded.split(',').next() {
            let primera = primera.trim();
            if !primera.is_empty() {
                return Some(primera.to_string());
            }
        }
    }
    Some(addr.ip().to_string())
}

// GET /api/contenidos (Soporta ?categoria=news&estado=todos&search=texto&limit=20)
pub async fn listar_contenidos_handler(
    opts: Option<Query<FilterOptions>>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Query(opts) = opts.unwrap_or(Query(FilterOptions::default()));

    // Por defecto solo lo publicado; 'todos' desactiva el filtro de estado
    let estado = match opts.estado.as_deref() {
        None => Some("publicado".to_string()),
        Some("todos") => None,
        Some(e) => match EstadoPublicacion::parse(e) {
            Some(v) => Some(v.as_str().to_string()),
            None => return (StatusCode::BAD_REQUEST, "Estado inválido").into_response(),
        },
    };
    let categoria = match opts.categoria.as_deref() {
        None => None,
        Some(c) => match Categoria::parse(c) {
            Some(v) => Some(v.as_str().to_string()),
            None => return (StatusCode::BAD_REQUEST, "Categoría inválida").into_response(),
        },
    };
    let subcategoria = opts.subcategoria.filter(|s| s != "ver_todo");

    // Lógica booleana dentro del SQL para filtrar dinámicamente:
    // ($n IS NULL OR ...) ignora el filtro cuando no vino el parámetro.
    let sql = format!(
        "SELECT {} FROM contenidos \
         WHERE \
             ($1::text IS NULL OR categoria = $1) \
             AND ($2::text IS NULL OR estado = $2) \
             AND ($3::text IS NULL OR subcategoria_madeinarg = $3) \
             AND ($4::text IS NULL OR (titulo ILIKE '%' || $4 || '%' OR contenido_news ILIKE '%' || $4 || '%')) \
         ORDER BY fecha_publicacion DESC \
         LIMIT $5",
        COLUMNAS_CONTENIDO
    );
    let result = sqlx::query_as::<_, ContenidoRow>(&sql)
        .bind(categoria)
        .bind(estado)
        .bind(subcategoria)
        .bind(opts.search)
        .bind(limite(opts.limit, 20))
        .fetch_all(&state.pool)
        .await;

    match result {
        Ok(filas) => {
            let contenidos: Vec<Contenido> =
                filas.into_iter().map(ContenidoRow::into_contenido).collect();
            (StatusCode::OK, Json(contenidos)).into_response()
        }
        Err(e) => {
            tracing::error!("Error buscando contenidos: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response()
        }
    }
}

// GET /api/contenidos/:id - detalle, sin efectos sobre contadores
pub async fn get_contenido_handler(
    Path(param): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ContenidoError> {
    let id = parsear_id(&param).ok_or(ContenidoError::NoEncontrado)?;
    let contenido = contenido_srv::buscar_por_id(&state.pool, id).await?;
    let espacios = contenido_srv::espacios_de(&state.pool, id).await?;
    let imagenes = media::urls_de(&state.pool, id).await?;

    let mut cuerpo = match serde_json::to_value(&contenido) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Error serializando contenido {}: {:?}", id, e);
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response());
        }
    };
    if let serde_json::Value::Object(ref mut mapa) = cuerpo {
        mapa.insert("espacios_referencia".to_string(), json!(espacios));
        mapa.insert("imagenes".to_string(), json!(imagenes));
    }
    Ok((StatusCode::OK, Json(cuerpo)).into_response())
}

// POST /api/contenidos/:id/visita - la única operación que cuenta visitas
pub async fn registrar_visita_handler(
    Path(id): Path<i64>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ContenidoError> {
    let ip = ip_del_cliente(&headers, &addr);
    let resultado = visitas::registrar_visita(&state.pool, id, ip.as_deref()).await?;
    Ok((StatusCode::OK, Json(resultado)))
}

// POST /api/contenidos - Alta validada
pub async fn crear_contenido_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CrearContenidoPayload>,
) -> Result<impl IntoResponse, ContenidoError> {
    let contenido = contenido_srv::crear(&state.pool, Some(claims.user_id), payload).await?;

    // Crear directo en publicado también dispara el newsletter (estado
    // anterior: inexistente)
    newsletter::despachar_si_nueva_publicacion(&state, None, &contenido);

    Ok((StatusCode::CREATED, Json(contenido)))
}

// PUT /api/contenidos/:id - Update parcial + reconciliación de imágenes
pub async fn actualizar_contenido_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ActualizarContenidoPayload>,
) -> Result<impl IntoResponse, ContenidoError> {
    // Autorización: admin puede todo, editor solo sus contenidos
    let existente = contenido_srv::buscar_por_id(&state.pool, id).await?;
    let es_admin = claims.role == ROL_ADMIN;
    let es_autor = existente.autor_id == Some(claims.user_id);
    if !es_admin && !es_autor {
        return Ok(
            (StatusCode::FORBIDDEN, "No puedes editar contenidos de otros").into_response(),
        );
    }

    let (contenido, estado_anterior) =
        contenido_srv::actualizar(&state.pool, id, payload).await?;

    // Los fallos de imagen no voltean el guardado: el resumen informa qué
    // slots quedaron pendientes para el próximo intento.
    let proceso = media::procesar_imagenes(&state.pool, &state.imgbb, id).await?;

    newsletter::despachar_si_nueva_publicacion(&state, Some(estado_anterior), &contenido);

    let mut cuerpo = match serde_json::to_value(&contenido) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Error serializando contenido {}: {:?}", id, e);
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response());
        }
    };
    if let serde_json::Value::Object(ref mut mapa) = cuerpo {
        mapa.insert("imagenes_proceso".to_string(), json!(proceso));
    }
    Ok((StatusCode::OK, Json(cuerpo)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CambiarEstadoPayload {
    pub estado: String,
}

// POST /api/admin/contenidos/:id/estado - la única entrada administrativa
// que puede disparar una publicación fuera del alta
pub async fn cambiar_estado_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<CambiarEstadoPayload>,
) -> Result<impl IntoResponse, ContenidoError> {
    let (contenido, estado_anterior) =
        contenido_srv::cambiar_estado(&state.pool, id, &payload.estado).await?;

    newsletter::despachar_si_nueva_publicacion(&state, Some(estado_anterior), &contenido);

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "nuevo_estado": contenido.estado.as_str(),
        })),
    ))
}

// DELETE /api/contenidos/:id - baja lógica (a la papelera)
pub async fn eliminar_contenido_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ContenidoError> {
    contenido_srv::mover_a_papelera(&state.pool, id).await?;
    Ok((StatusCode::OK, "Contenido movido a la papelera"))
}

// DELETE /api/admin/contenidos/:id/definitivo - borrado físico; antes avisa
// al pipeline de medios para la limpieza best-effort de las imágenes
pub async fn eliminar_definitivo_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ContenidoError> {
    // Verificamos si existe primero para no dar falsos positivos
    contenido_srv::buscar_por_id(&state.pool, id).await?;

    media::limpiar_al_eliminar(&state.pool, &state.imgbb, id).await?;

    let result = sqlx::query("DELETE FROM contenidos WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ContenidoError::NoEncontrado);
    }
    Ok((StatusCode::OK, "Contenido eliminado definitivamente"))
}

// POST /api/contenidos/:id/duplicar
pub async fn duplicar_contenido_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ContenidoError> {
    let copia = contenido_srv::duplicar(&state.pool, id).await?;
    Ok((StatusCode::CREATED, Json(copia)))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitOptions {
    pub limit: Option<i64>,
    pub categoria: Option<String>,
}

// GET /api/contenidos/mas-vistas - más visto dentro de la ventana semanal.
// Proyección pura: acá no se resetea ni se deduplica nada.
pub async fn mas_vistas_handler(
    opts: Option<Query<LimitOptions>>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Query(opts) = opts.unwrap_or(Query(LimitOptions::default()));
    let sql = format!(
        "SELECT {} FROM contenidos \
         WHERE estado = 'publicado' \
           AND ultima_actualizacion_contador >= NOW() - INTERVAL '7 days' \
         ORDER BY contador_visitas DESC \
         LIMIT $1",
        COLUMNAS_CONTENIDO
    );
    proyeccion(&state, &sql, limite(opts.limit, 10)).await
}

// GET /api/contenidos/mas-leidas - más leído de todos los tiempos
pub async fn mas_leidas_handler(
    opts: Option<Query<LimitOptions>>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Query(opts) = opts.unwrap_or(Query(LimitOptions::default()));
    let sql = format!(
        "SELECT {} FROM contenidos \
         WHERE estado = 'publicado' \
         ORDER BY contador_visitas_total DESC \
         LIMIT $1",
        COLUMNAS_CONTENIDO
    );
    proyeccion(&state, &sql, limite(opts.limit, 10)).await
}

// GET /api/contenidos/recientes
pub async fn recientes_handler(
    opts: Option<Query<LimitOptions>>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Query(opts) = opts.unwrap_or(Query(LimitOptions::default()));
    let categoria = match opts.categoria.as_deref() {
        None => None,
        Some(c) => match Categoria::parse(c) {
            Some(v) => Some(v.as_str().to_string()),
            None => return (StatusCode::BAD_REQUEST, "Categoría inválida").into_response(),
        },
    };
    let sql = format!(
        "SELECT {} FROM contenidos \
         WHERE estado = 'publicado' AND ($2::text IS NULL OR categoria = $2) \
         ORDER BY fecha_publicacion DESC \
         LIMIT $1",
        COLUMNAS_CONTENIDO
    );
    let result = sqlx::query_as::<_, ContenidoRow>(&sql)
        .bind(limite(opts.limit, 10))
        .bind(categoria)
        .fetch_all(&state.pool)
        .await;
    respuesta_lista(result)
}

async fn proyeccion(state: &AppState, sql: &str, limit: i64) -> axum::response::Response {
    let result = sqlx::query_as::<_, ContenidoRow>(sql)
        .bind(limit)
        .fetch_all(&state.pool)
        .await;
    respuesta_lista(result)
}

fn respuesta_lista(
    result: Result<Vec<ContenidoRow>, sqlx::Error>,
) -> axum::response::Response {
    match result {
        Ok(filas) => {
            let contenidos: Vec<Contenido> =
                filas.into_iter().map(ContenidoRow::into_contenido).collect();
            (StatusCode::OK, Json(contenidos)).into_response()
        }
        Err(e) => {
            tracing::error!("Error en proyección de contenidos: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetContadoresPayload {
    pub contenido_ids: Vec<i64>,
}

// POST /api/admin/contenidos/reset-contadores - reset administrativo
pub async fn reset_contadores_handler(
    State(state): State<AppState>,
    Json(payload): Json<ResetContadoresPayload>,
) -> impl IntoResponse {
    match visitas::reset_contadores(&state.pool, &payload.contenido_ids).await {
        Ok(afectadas) => {
            (StatusCode::OK, Json(json!({ "reseteados": afectadas }))).into_response()
        }
        Err(e) => {
            tracing::error!("Error reseteando contadores: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response()
        }
    }
}

// GET /api/categorias - las cinco categorías con su nombre visible
pub async fn listar_categorias_handler() -> impl IntoResponse {
    let categorias: Vec<_> = Categoria::TODAS
        .iter()
        .map(|c| json!({ "key": c.as_str(), "nombre": c.nombre_display() }))
        .collect();
    (StatusCode::OK, Json(categorias))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsear_id_acepta_pk_y_pk_slug() {
        assert_eq!(parsear_id("42"), Some(42));
        assert_eq!(parsear_id("42-mi-nota"), Some(42));
        assert_eq!(parsear_id("mi-nota"), None);
        assert_eq!(parsear_id(""), None);
    }

    #[test]
    fn limite_acotado_entre_1_y_100() {
        assert_eq!(limite(None, 10), 10);
        assert_eq!(limite(Some(5), 10), 5);
        assert_eq!(limite(Some(0), 10), 1);
        assert_eq!(limite(Some(500), 10), 100);
    }
}
