use serde::Serialize;

use crate::db::DbPool;
use crate::error::ContenidoError;

/// La ventana del contador semanal.
pub const VENTANA_DIAS: i32 = 7;
/// Dos visitas de la misma dirección dentro de este lapso cuentan una sola vez.
pub const DEDUP_MINUTOS: i32 = 5;

#[derive(Debug, Serialize)]
pub struct ResultadoVisita {
    pub contada: bool,
    pub contador_visitas: i32,
    pub contador_visitas_total: i32,
}

/// Registra una visita. Es la única operación con efectos sobre los
/// contadores; las lecturas (más vistas, más leídas) son proyecciones puras.
///
/// Orden del autómata: (1) si la ventana venció, el contador semanal vuelve
/// a cero; (2) si hay una visita reciente de la misma dirección, no se
/// cuenta nada; (3) si no, fila de auditoría nueva y ambos contadores +1.
/// Los incrementos son aritmética dentro del UPDATE: sin read-modify-write,
/// sin updates perdidos bajo visitas concurrentes.
pub async fn registrar_visita(
    pool: &DbPool,
    contenido_id: i64,
    ip: Option<&str>,
) -> Result<ResultadoVisita, ContenidoError> {
    let existe: Option<i64> = sqlx::query_scalar("SELECT id FROM contenidos WHERE id = $1")
        .bind(contenido_id)
        .fetch_optional(pool)
        .await?;
    if existe.is_none() {
        return Err(ContenidoError::NoEncontrado);
    }

    // 1. Reset condicional de la ventana, en una sola sentencia
    sqlx::query(
        "UPDATE contenidos SET contador_visitas = 0, ultima_actualizacion_contador = NOW() \
         WHERE id = $1 AND NOW() - ultima_actualizacion_contador > make_interval(days => $2)",
    )
    .bind(contenido_id)
    .bind(VENTANA_DIAS)
    .execute(pool)
    .await?;

    // 2. Dedup por (contenido, ip): el INSERT condicional decide en el mismo
    //    viaje si la visita cuenta. Sin ip no hay con qué deduplicar y se
    //    registra siempre.
    let contada = match ip {
        Some(ip) => sqlx::query_scalar::<_, i64>(
            "INSERT INTO contenido_visitas (contenido_id, ip_address) \
             SELECT $1, $2 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM contenido_visitas \
                 WHERE contenido_id = $1 AND ip_address = $2 \
                   AND fecha >= NOW() - make_interval(mins => $3) \
             ) \
             RETURNING id",
        )
        .bind(contenido_id)
        .bind(ip)
        .bind(DEDUP_MINUTOS)
        .fetch_optional(pool)
        .await?
        .is_some(),
        None => {
            sqlx::query("INSERT INTO contenido_visitas (contenido_id) VALUES ($1)")
                .bind(contenido_id)
                .execute(pool)
                .await?;
            true
        }
    };

    // 3. Contadores
    if contada {
        let (ventana, total): (i32, i32) = sqlx::query_as(
            "UPDATE contenidos \
             SET contador_visitas = contador_visitas + 1, \
                 contador_visitas_total = contador_visitas_total + 1 \
             WHERE id = $1 \
             RETURNING contador_visitas, contador_visitas_total",
        )
        .bind(contenido_id)
        .fetch_one(pool)
        .await?;
        Ok(ResultadoVisita {
            contada: true,
            contador_visitas: ventana,
            contador_visitas_total: total,
        })
    } else {
        let (ventana, total): (i32, i32) = sqlx::query_as(
            "SELECT contador_visitas, contador_visitas_total FROM contenidos WHERE id = $1",
        )
        .bind(contenido_id)
        .fetch_one(pool)
        .await?;
        Ok(ResultadoVisita {
            contada: false,
            contador_visitas: ventana,
            contador_visitas_total: total,
        })
    }
}

/// Reset administrativo explícito: ambos contadores a cero. Es la única vía
/// que toca `contador_visitas_total`.
pub async fn reset_contadores(pool: &DbPool, contenido_ids: &[i64]) -> Result<u64, sqlx::Error> {
    let afectadas = sqlx::query(
        "UPDATE contenidos \
         SET contador_visitas = 0, contador_visitas_total = 0, \
             ultima_actualizacion_contador = NOW() \
         WHERE id = ANY($1)",
    )
    .bind(contenido_ids)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(afectadas)
}
