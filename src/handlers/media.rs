use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use mime::Mime;
use serde::Deserialize;
use serde_json::json;
use std::path::Path as FsPath;

use crate::{
    error::ContenidoError,
    models::contenido::{Categoria, TipoMedia, MAX_SLOTS},
    services::{contenido as contenido_srv, imgbb::UploadError, media},
    state::AppState,
};

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024; // 5MB

/// Lee el campo "image" del formulario y valida tamaño y tipo. Devuelve los
/// bytes y la extensión saneada.
async fn leer_imagen_multipart(
    multipart: &mut Multipart,
) -> Result<(Vec<u8>, String), (StatusCode, &'static str)> {
    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name == "image" {
            let file_name = field.file_name().unwrap_or("unknown.jpg").to_string();
            let content_type: Option<Mime> = field
                .content_type()
                .and_then(|ct_str| ct_str.parse::<Mime>().ok());

            // Obtener extensión (jpg, png)
            let extension = FsPath::new(&file_name)
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("jpg")
                .to_lowercase();
            let extension = if extension.chars().all(|c| c.is_ascii_alphanumeric()) {
                extension
            } else {
                "jpg".to_string()
            };

            // Leer los bytes del archivo
            let data = match field.bytes().await {
                Ok(bytes) => bytes,
                Err(_) => return Err((StatusCode::BAD_REQUEST, "Error al leer el archivo")),
            };

            // Validar tamaño
            if data.len() > MAX_IMAGE_BYTES {
                return Err((
                    StatusCode::BAD_REQUEST,
                    "La imagen excede el tamaño máximo de 5MB",
                ));
            }

            // Validar MIME (solo imágenes comunes)
            if let Some(ct) = content_type {
                let type_str = ct.type_().as_str();
                let sub_str = ct.subtype().as_str();
                let allowed = matches!(
                    (type_str, sub_str),
                    ("image", "jpeg") | ("image", "png") | ("image", "webp") | ("image", "gif")
                );
                if !allowed {
                    return Err((
                        StatusCode::BAD_REQUEST,
                        "Solo se permiten imágenes (jpg, png, webp, gif)",
                    ));
                }
            }

            return Ok((data.to_vec(), extension));
        }
    }

    Err((StatusCode::BAD_REQUEST, "No se envió ningún campo 'image'"))
}

#[derive(Debug, Deserialize)]
pub struct TipoQuery {
    pub tipo: Option<String>,
}

// POST /api/contenidos/:id/imagenes/:indice?tipo=galeria|backstage
// Boundary `receive`: el binario queda en staging y el pipeline reconcilia
// todos los slots pendientes del contenido en la misma pasada.
pub async fn recibir_imagen_handler(
    Path((id, indice)): Path<(i64, i32)>,
    Query(q): Query<TipoQuery>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ContenidoError> {
    if !(1..=MAX_SLOTS).contains(&indice) {
        return Err(ContenidoError::Validacion(format!(
            "Índice de imagen fuera de rango: {} (1..{})",
            indice, MAX_SLOTS
        )));
    }

    let tipo = match q.tipo.as_deref() {
        None => TipoMedia::Galeria,
        Some(t) => TipoMedia::parse(t).ok_or_else(|| {
            ContenidoError::Validacion(format!(
                "Tipo de imagen inválido: '{}'. Opciones: galeria, backstage",
                t
            ))
        })?,
    };

    let contenido = contenido_srv::buscar_por_id(&state.pool, id).await?;
    // Solo Issues tiene galería de backstage
    if tipo == TipoMedia::Backstage && contenido.categoria() != Categoria::Issues {
        return Err(ContenidoError::Validacion(
            "Solo los Issues llevan imágenes de backstage".to_string(),
        ));
    }

    let (datos, extension) = match leer_imagen_multipart(&mut multipart).await {
        Ok(v) => v,
        Err((status, msg)) => return Ok((status, msg).into_response()),
    };

    if let Err(e) = media::recibir_en_slot(
        &state.pool,
        id,
        tipo,
        indice,
        &datos,
        &extension,
        &state.config.upload_dir,
    )
    .await
    {
        tracing::error!("Error guardando imagen en staging: {:?}", e);
        return Ok(
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo guardar la imagen").into_response(),
        );
    }

    let proceso = media::procesar_imagenes(&state.pool, &state.imgbb, id).await?;
    let imagenes = media::urls_de(&state.pool, id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "imagenes": imagenes,
            "proceso": proceso,
        })),
    )
        .into_response())
}

// GET /api/contenidos/:id/imagenes - boundary `emit`
pub async fn emitir_imagenes_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ContenidoError> {
    contenido_srv::buscar_por_id(&state.pool, id).await?;
    let imagenes = media::urls_de(&state.pool, id).await?;
    Ok((StatusCode::OK, Json(imagenes)))
}

// POST /api/upload - subida directa a ImgBB, devuelve la URL remota
pub async fn upload_directo_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let (datos, _extension) = match leer_imagen_multipart(&mut multipart).await {
        Ok(v) => v,
        Err((status, msg)) => return (status, msg).into_response(),
    };

    match state.imgbb.upload(&datos).await {
        Ok(url) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "url": url,
                "message": "Imagen subida exitosamente"
            })),
        )
            .into_response(),
        Err(UploadError::RateLimited(intentos)) => {
            tracing::warn!("ImgBB rate limit tras {} intentos", intentos);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "El host de imágenes está limitando peticiones, probá de nuevo en un rato",
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Error al subir imagen a ImgBB: {}", e);
            (StatusCode::BAD_GATEWAY, "Error al subir la imagen").into_response()
        }
    }
}
