use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DbPool;
use crate::models::contenido::{MediaSlot, TipoMedia};
use crate::services::imgbb::ImgbbClient;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("No se pudo guardar el archivo en staging: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Resultado de una pasada de reconciliación, informado en la respuesta del
/// guardado para que el cliente sepa qué slots quedaron pendientes.
#[derive(Debug, Default, Serialize)]
pub struct ResumenImagenes {
    pub subidas: Vec<String>,
    pub fallidas: Vec<String>,
}

fn etiqueta(tipo: &str, indice: i32) -> String {
    format!("{}:{}", tipo, indice)
}

/// Reconcilia todos los slots pendientes de un contenido contra ImgBB.
///
/// Cada slot es independiente: un fallo deja su referencia local intacta
/// (y la URL previa, si la había) para reintentar en el próximo guardado,
/// y no corta el procesamiento del resto. Los slots sin binario pendiente
/// no se tocan.
pub async fn procesar_imagenes(
    pool: &DbPool,
    imgbb: &Arc<ImgbbClient>,
    contenido_id: i64,
) -> Result<ResumenImagenes, sqlx::Error> {
    let pendientes = sqlx::query_as::<_, MediaSlot>(
        "SELECT id, contenido_id, tipo, indice, url_remota, archivo_local \
         FROM media_slots \
         WHERE contenido_id = $1 AND archivo_local IS NOT NULL \
         ORDER BY tipo, indice",
    )
    .bind(contenido_id)
    .fetch_all(pool)
    .await?;

    let mut resumen = ResumenImagenes::default();

    for slot in pendientes {
        let Some(ruta) = slot.archivo_local.clone() else {
            continue;
        };
        let nombre = etiqueta(&slot.tipo, slot.indice);

        let datos = match tokio::fs::read(&ruta).await {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(
                    "No se pudo leer el staging {} del slot {} (contenido {}): {:?}",
                    ruta,
                    nombre,
                    contenido_id,
                    e
                );
                resumen.fallidas.push(nombre);
                continue;
            }
        };

        match imgbb.upload(&datos).await {
            Ok(url) => {
                let anterior = slot.url_remota.clone();
                // Segunda fase del guardado: la URL nueva queda persistida y
                // la referencia local se limpia en la misma sentencia.
                sqlx::query(
                    "UPDATE media_slots SET url_remota = $1, archivo_local = NULL WHERE id = $2",
                )
                .bind(&url)
                .bind(slot.id)
                .execute(pool)
                .await?;

                if let Err(e) = tokio::fs::remove_file(&ruta).await {
                    tracing::warn!("No se pudo borrar el staging {}: {:?}", ruta, e);
                }

                // La URL reemplazada se intenta borrar del host sin bloquear
                // el guardado (best effort, ver ImgbbClient::delete)
                if let Some(vieja) = anterior.filter(|v| v != &url) {
                    let imgbb = Arc::clone(imgbb);
                    tokio::spawn(async move {
                        imgbb.delete(&vieja).await;
                    });
                }

                tracing::info!(
                    "Imagen {} de contenido {} subida a ImgBB: {}",
                    nombre,
                    contenido_id,
                    url
                );
                resumen.subidas.push(nombre);
            }
            Err(e) => {
                tracing::warn!(
                    "Fallo al subir {} de contenido {}: {}",
                    nombre,
                    contenido_id,
                    e
                );
                resumen.fallidas.push(nombre);
            }
        }
    }

    Ok(resumen)
}

/// Boundary `receive`: guarda el binario en el staging local y lo anota como
/// pendiente en su slot. Si el slot ya tenía un archivo esperando, el viejo
/// se descarta.
pub async fn recibir_en_slot(
    pool: &DbPool,
    contenido_id: i64,
    tipo: TipoMedia,
    indice: i32,
    datos: &[u8],
    extension: &str,
    upload_dir: &Path,
) -> Result<(), MediaError> {
    let nombre_archivo = format!("{}.{}", Uuid::new_v4(), extension);
    let ruta = upload_dir.join(&nombre_archivo);
    tokio::fs::write(&ruta, datos).await?;
    let ruta_str = ruta.to_string_lossy().to_string();

    let anterior: Option<String> = sqlx::query_scalar(
        "SELECT archivo_local FROM media_slots \
         WHERE contenido_id = $1 AND tipo = $2 AND indice = $3",
    )
    .bind(contenido_id)
    .bind(tipo.as_str())
    .bind(indice)
    .fetch_optional(pool)
    .await?
    .flatten();

    sqlx::query(
        "INSERT INTO media_slots (contenido_id, tipo, indice, archivo_local) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (contenido_id, tipo, indice) \
         DO UPDATE SET archivo_local = EXCLUDED.archivo_local",
    )
    .bind(contenido_id)
    .bind(tipo.as_str())
    .bind(indice)
    .bind(&ruta_str)
    .execute(pool)
    .await?;

    if let Some(viejo) = anterior {
        if let Err(e) = tokio::fs::remove_file(&viejo).await {
            tracing::warn!("No se pudo borrar el staging reemplazado {}: {:?}", viejo, e);
        }
    }

    Ok(())
}

/// Boundary `emit`: mapa indice → URL por tipo de galería.
#[derive(Debug, Default, Serialize)]
pub struct MapaImagenes {
    pub galeria: BTreeMap<i32, String>,
    pub backstage: BTreeMap<i32, String>,
}

pub async fn urls_de(pool: &DbPool, contenido_id: i64) -> Result<MapaImagenes, sqlx::Error> {
    let slots = sqlx::query_as::<_, MediaSlot>(
        "SELECT id, contenido_id, tipo, indice, url_remota, archivo_local \
         FROM media_slots \
         WHERE contenido_id = $1 AND url_remota IS NOT NULL \
         ORDER BY indice",
    )
    .bind(contenido_id)
    .fetch_all(pool)
    .await?;

    let mut mapa = MapaImagenes::default();
    for slot in slots {
        let Some(url) = slot.url_remota else { continue };
        match TipoMedia::parse(&slot.tipo) {
            Some(TipoMedia::Galeria) => {
                mapa.galeria.insert(slot.indice, url);
            }
            Some(TipoMedia::Backstage) => {
                mapa.backstage.insert(slot.indice, url);
            }
            None => tracing::warn!("Slot {} con tipo desconocido '{}'", slot.id, slot.tipo),
        }
    }
    Ok(mapa)
}

/// Aviso de limpieza previo a un borrado definitivo: se descartan los
/// archivos en staging y se encola el borrado best-effort de las URLs
/// remotas. Nunca bloquea la operación que lo dispara.
pub async fn limpiar_al_eliminar(
    pool: &DbPool,
    imgbb: &Arc<ImgbbClient>,
    contenido_id: i64,
) -> Result<(), sqlx::Error> {
    let slots = sqlx::query_as::<_, MediaSlot>(
        "SELECT id, contenido_id, tipo, indice, url_remota, archivo_local \
         FROM media_slots WHERE contenido_id = $1",
    )
    .bind(contenido_id)
    .fetch_all(pool)
    .await?;

    for slot in slots {
        if let Some(ruta) = slot.archivo_local {
            if let Err(e) = tokio::fs::remove_file(&ruta).await {
                tracing::warn!("No se pudo borrar el staging {}: {:?}", ruta, e);
            }
        }
        if let Some(url) = slot.url_remota {
            let imgbb = Arc::clone(imgbb);
            tokio::spawn(async move {
                imgbb.delete(&url).await;
            });
        }
    }
    Ok(())
}
