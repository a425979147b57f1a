use chrono::Utc;

use crate::db::DbPool;
use crate::error::{es_conflicto_unico, ContenidoError};
use crate::models::contenido::{
    normalizar_espacios, ActualizarContenidoPayload, Categoria, Contenido, ContenidoRow,
    CrearContenidoPayload, DatosCategoria, EspacioNuevo, EspacioReferencia, EstadoPublicacion,
    COLUMNAS_CONTENIDO,
};
use crate::utils::slug::generar_slug_unico;

/// Reintentos ante empates de slug o de número de issue en creaciones
/// concurrentes, antes de rendirse.
const MAX_REINTENTOS: u32 = 3;

const RESTRICCION_NUMERO_ISSUE: &str = "ux_contenidos_numero_issue";
const RESTRICCION_SLUG: &str = "contenidos_slug_key";

pub async fn buscar_por_id(pool: &DbPool, id: i64) -> Result<Contenido, ContenidoError> {
    let sql = format!("SELECT {} FROM contenidos WHERE id = $1", COLUMNAS_CONTENIDO);
    let fila = sqlx::query_as::<_, ContenidoRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    fila.map(ContenidoRow::into_contenido)
        .ok_or(ContenidoError::NoEncontrado)
}

fn parsear_categoria(valor: &str) -> Result<Categoria, ContenidoError> {
    Categoria::parse(valor).ok_or_else(|| {
        ContenidoError::Validacion(format!(
            "Categoría inválida: '{}'. Opciones: editorials, issues, madeinarg, news, club_pompa",
            valor
        ))
    })
}

fn parsear_estado(valor: &str) -> Result<EstadoPublicacion, ContenidoError> {
    EstadoPublicacion::parse(valor).ok_or_else(|| {
        ContenidoError::Validacion(format!(
            "Estado inválido: '{}'. Opciones: borrador, en_papelera, publicado, listo_para_editar",
            valor
        ))
    })
}

/// Alta validada: primero el esquema (corta todo si falla), después el
/// INSERT con slug único y número de issue asignado, por último los
/// espacios de referencia.
pub async fn crear(
    pool: &DbPool,
    autor_id: Option<i64>,
    payload: CrearContenidoPayload,
) -> Result<Contenido, ContenidoError> {
    let categoria = parsear_categoria(&payload.categoria)?;
    let estado = match payload.estado.as_deref() {
        Some(e) => parsear_estado(e)?,
        None => EstadoPublicacion::Borrador,
    };
    let datos = DatosCategoria::validar(categoria, payload.campos)?;

    let contenido = insertar(
        pool,
        autor_id,
        &payload.titulo,
        payload.fecha_publicacion,
        estado,
        &datos,
    )
    .await?;

    if let Some(lista) = payload.espacios_referencia {
        reemplazar_espacios(pool, contenido.id, &normalizar_espacios(lista)).await?;
    }

    Ok(contenido)
}

async fn insertar(
    pool: &DbPool,
    autor_id: Option<i64>,
    titulo: &str,
    fecha_publicacion: chrono::NaiveDate,
    estado: EstadoPublicacion,
    datos: &DatosCategoria,
) -> Result<Contenido, ContenidoError> {
    let campos = datos.a_campos();
    let asignar_numero =
        datos.categoria() == Categoria::Issues && campos.numero_issue.is_none();

    let mut intento: u32 = 0;
    loop {
        intento += 1;
        // El slug se vuelve a sondear en cada vuelta: si perdimos la carrera
        // contra otro título igual, acá sale el sufijo siguiente.
        let slug = generar_slug_unico(pool, titulo).await?;

        let resultado = if asignar_numero {
            // max+1 dentro del propio INSERT; el índice único parcial corta
            // el empate entre creaciones concurrentes y el loop reintenta.
            let sql = format!(
                "INSERT INTO contenidos (categoria, titulo, slug, autor_id, fecha_publicacion, estado, \
                     numero_issue, nombre_modelo, subtitulo_issue, frase_final_issue, video_youtube_issue, \
                     subcategoria_madeinarg, subtitulo_madeinarg, tags_marcas, \
                     subtitulos_news, contenido_news, video_youtube_news) \
                 VALUES ($1, $2, $3, $4, $5, $6, \
                     (SELECT COALESCE(MAX(numero_issue), 0) + 1 FROM contenidos WHERE categoria = 'issues'), \
                     $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
                 RETURNING {}",
                COLUMNAS_CONTENIDO
            );
            sqlx::query_as::<_, ContenidoRow>(&sql)
                .bind(datos.categoria().as_str())
                .bind(titulo)
                .bind(&slug)
                .bind(autor_id)
                .bind(fecha_publicacion)
                .bind(estado.as_str())
                .bind(&campos.nombre_modelo)
                .bind(&campos.subtitulo_issue)
                .bind(&campos.frase_final_issue)
                .bind(&campos.video_youtube_issue)
                .bind(&campos.subcategoria_madeinarg)
                .bind(&campos.subtitulo_madeinarg)
                .bind(&campos.tags_marcas)
                .bind(&campos.subtitulos_news)
                .bind(&campos.contenido_news)
                .bind(&campos.video_youtube_news)
                .fetch_one(pool)
                .await
        } else {
            let sql = format!(
                "INSERT INTO contenidos (categoria, titulo, slug, autor_id, fecha_publicacion, estado, \
                     numero_issue, nombre_modelo, subtitulo_issue, frase_final_issue, video_youtube_issue, \
                     subcategoria_madeinarg, subtitulo_madeinarg, tags_marcas, \
                     subtitulos_news, contenido_news, video_youtube_news) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
                 RETURNING {}",
                COLUMNAS_CONTENIDO
            );
            sqlx::query_as::<_, ContenidoRow>(&sql)
                .bind(datos.categoria().as_str())
                .bind(titulo)
                .bind(&slug)
                .bind(autor_id)
                .bind(fecha_publicacion)
                .bind(estado.as_str())
                .bind(campos.numero_issue)
                .bind(&campos.nombre_modelo)
                .bind(&campos.subtitulo_issue)
                .bind(&campos.frase_final_issue)
                .bind(&campos.video_youtube_issue)
                .bind(&campos.subcategoria_madeinarg)
                .bind(&campos.subtitulo_madeinarg)
                .bind(&campos.tags_marcas)
                .bind(&campos.subtitulos_news)
                .bind(&campos.contenido_news)
                .bind(&campos.video_youtube_news)
                .fetch_one(pool)
                .await
        };

        match resultado {
            Ok(fila) => return Ok(fila.into_contenido()),
            Err(e) if es_conflicto_unico(&e, RESTRICCION_NUMERO_ISSUE) => {
                if intento >= MAX_REINTENTOS {
                    return Err(ContenidoError::ConflictoSecuencia);
                }
                tracing::warn!(
                    "Conflicto de numero_issue al crear '{}', reintento {}/{}",
                    titulo,
                    intento,
                    MAX_REINTENTOS
                );
            }
            Err(e) if es_conflicto_unico(&e, RESTRICCION_SLUG) => {
                if intento >= MAX_REINTENTOS {
                    return Err(ContenidoError::Db(e));
                }
                tracing::warn!(
                    "Conflicto de slug al crear '{}', reintento {}/{}",
                    titulo,
                    intento,
                    MAX_REINTENTOS
                );
            }
            Err(e) => return Err(ContenidoError::Db(e)),
        }
    }
}

/// Update parcial: mezcla lo recibido con lo persistido, revalida el
/// esquema contra la categoría resultante y escribe todo en un solo UPDATE.
/// El slug es inmutable. Devuelve el contenido nuevo y el estado anterior
/// persistido, para la detección de transición de publicación.
pub async fn actualizar(
    pool: &DbPool,
    id: i64,
    payload: ActualizarContenidoPayload,
) -> Result<(Contenido, EstadoPublicacion), ContenidoError> {
    let existente = buscar_por_id(pool, id).await?;
    let estado_anterior = existente.estado;

    let categoria = match payload.categoria.as_deref() {
        Some(c) => parsear_categoria(c)?,
        None => existente.categoria(),
    };
    let estado = match payload.estado.as_deref() {
        Some(e) => parsear_estado(e)?,
        None => existente.estado,
    };
    let titulo = payload.titulo.unwrap_or_else(|| existente.titulo.clone());
    let fecha_publicacion = payload
        .fecha_publicacion
        .unwrap_or(existente.fecha_publicacion);
    let autor_id = payload.autor_id.or(existente.autor_id);

    let campos = existente.datos.a_campos().mezclar(payload.campos);
    let datos = DatosCategoria::validar(categoria, campos)?;
    let campos = datos.a_campos();
    let asignar_numero = categoria == Categoria::Issues && campos.numero_issue.is_none();

    let mut intento: u32 = 0;
    let actualizado = loop {
        intento += 1;
        // Si pasa a issues sin número, max+1 dentro del propio UPDATE; con
        // número explícito COALESCE lo respeta tal cual.
        let numero_sql = if asignar_numero {
            "COALESCE($7, (SELECT COALESCE(MAX(c2.numero_issue), 0) + 1 \
                           FROM contenidos c2 WHERE c2.categoria = 'issues' AND c2.id <> $6))"
        } else {
            "$7"
        };
        let sql = format!(
            "UPDATE contenidos SET categoria = $1, titulo = $2, fecha_publicacion = $3, \
                 estado = $4, autor_id = $5, updated_at = NOW(), \
                 numero_issue = {}, nombre_modelo = $8, subtitulo_issue = $9, \
                 frase_final_issue = $10, video_youtube_issue = $11, \
                 subcategoria_madeinarg = $12, subtitulo_madeinarg = $13, tags_marcas = $14, \
                 subtitulos_news = $15, contenido_news = $16, video_youtube_news = $17 \
             WHERE id = $6 \
             RETURNING {}",
            numero_sql, COLUMNAS_CONTENIDO
        );
        let resultado = sqlx::query_as::<_, ContenidoRow>(&sql)
            .bind(categoria.as_str())
            .bind(&titulo)
            .bind(fecha_publicacion)
            .bind(estado.as_str())
            .bind(autor_id)
            .bind(id)
            .bind(campos.numero_issue)
            .bind(&campos.nombre_modelo)
            .bind(&campos.subtitulo_issue)
            .bind(&campos.frase_final_issue)
            .bind(&campos.video_youtube_issue)
            .bind(&campos.subcategoria_madeinarg)
            .bind(&campos.subtitulo_madeinarg)
            .bind(&campos.tags_marcas)
            .bind(&campos.subtitulos_news)
            .bind(&campos.contenido_news)
            .bind(&campos.video_youtube_news)
            .fetch_one(pool)
            .await;

        match resultado {
            Ok(fila) => break fila.into_contenido(),
            Err(e) if es_conflicto_unico(&e, RESTRICCION_NUMERO_ISSUE) => {
                if intento >= MAX_REINTENTOS {
                    return Err(ContenidoError::ConflictoSecuencia);
                }
                tracing::warn!(
                    "Conflicto de numero_issue al actualizar contenido {}, reintento {}/{}",
                    id,
                    intento,
                    MAX_REINTENTOS
                );
            }
            Err(e) => return Err(ContenidoError::Db(e)),
        }
    };

    if let Some(lista) = payload.espacios_referencia {
        reemplazar_espacios(pool, id, &normalizar_espacios(lista)).await?;
    }

    Ok((actualizado, estado_anterior))
}

/// Cambio de estado puntual (la única entrada administrativa que puede
/// disparar una publicación fuera del alta).
pub async fn cambiar_estado(
    pool: &DbPool,
    id: i64,
    nuevo_estado: &str,
) -> Result<(Contenido, EstadoPublicacion), ContenidoError> {
    let estado = parsear_estado(nuevo_estado)?;
    let existente = buscar_por_id(pool, id).await?;

    sqlx::query("UPDATE contenidos SET estado = $1, updated_at = NOW() WHERE id = $2")
        .bind(estado.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    let mut actualizado = existente.clone();
    actualizado.estado = estado;
    Ok((actualizado, existente.estado))
}

/// Baja lógica: a la papelera, nunca se borra la fila desde acá.
pub async fn mover_a_papelera(pool: &DbPool, id: i64) -> Result<(), ContenidoError> {
    let afectadas =
        sqlx::query("UPDATE contenidos SET estado = 'en_papelera', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();
    if afectadas == 0 {
        return Err(ContenidoError::NoEncontrado);
    }
    Ok(())
}

/// Copia un contenido como borrador: título con prefijo, slug nuevo,
/// contadores en cero, número de issue reasignado y galería remota copiada.
pub async fn duplicar(pool: &DbPool, id: i64) -> Result<Contenido, ContenidoError> {
    let original = buscar_por_id(pool, id).await?;

    let titulo = format!("Copia de {}", original.titulo);
    let mut datos = original.datos.clone();
    if let DatosCategoria::Issues { numero_issue, .. } = &mut datos {
        *numero_issue = None;
    }

    let copia = insertar(
        pool,
        original.autor_id,
        &titulo,
        Utc::now().date_naive(),
        EstadoPublicacion::Borrador,
        &datos,
    )
    .await?;

    sqlx::query(
        "INSERT INTO espacios_referencia (contenido_id, texto_descriptivo, texto_mostrar, url, orden) \
         SELECT $1, texto_descriptivo, texto_mostrar, url, orden \
         FROM espacios_referencia WHERE contenido_id = $2",
    )
    .bind(copia.id)
    .bind(id)
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO media_slots (contenido_id, tipo, indice, url_remota) \
         SELECT $1, tipo, indice, url_remota \
         FROM media_slots WHERE contenido_id = $2 AND url_remota IS NOT NULL",
    )
    .bind(copia.id)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(copia)
}

/// Reemplazo total de los espacios de referencia, en una transacción para
/// no perder los existentes si un insert falla a mitad de camino.
pub async fn reemplazar_espacios(
    pool: &DbPool,
    contenido_id: i64,
    espacios: &[EspacioNuevo],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM espacios_referencia WHERE contenido_id = $1")
        .bind(contenido_id)
        .execute(&mut *tx)
        .await?;
    for espacio in espacios {
        sqlx::query(
            "INSERT INTO espacios_referencia (contenido_id, texto_descriptivo, texto_mostrar, url, orden) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(contenido_id)
        .bind(&espacio.texto_descriptivo)
        .bind(&espacio.texto_mostrar)
        .bind(&espacio.url)
        .bind(espacio.orden)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

pub async fn espacios_de(
    pool: &DbPool,
    contenido_id: i64,
) -> Result<Vec<EspacioReferencia>, sqlx::Error> {
    sqlx::query_as::<_, EspacioReferencia>(
        "SELECT id, contenido_id, texto_descriptivo, texto_mostrar, url, orden \
         FROM espacios_referencia WHERE contenido_id = $1 ORDER BY orden",
    )
    .bind(contenido_id)
    .fetch_all(pool)
    .await
}
