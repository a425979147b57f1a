use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::models::contenido::{Contenido, EstadoPublicacion};
use crate::models::suscriptor::Suscriptor;
use crate::services::mailer::Mailer;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("Ya se envió newsletter para este contenido")]
    YaEnviado,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Serialize)]
pub struct ResultadoEnvio {
    pub enviados: i32,
    pub errores: i32,
}

const COLUMNAS_SUSCRIPTOR: &str = "id, nombre, email, activo, token_desuscripcion, \
     fecha_suscripcion, suscrito_editorials, suscrito_issues, suscrito_madeinarg, \
     suscrito_news, suscrito_club_pompa";

/// Transición que dispara el newsletter: el estado persistido anterior no
/// era publicado y el nuevo sí (incluye crear directo en publicado). La
/// comparación es entre enums ya normalizados; 'Publicado' y 'publicado'
/// son el mismo estado.
pub fn es_nueva_publicacion(
    anterior: Option<EstadoPublicacion>,
    nuevo: EstadoPublicacion,
) -> bool {
    nuevo == EstadoPublicacion::Publicado && anterior != Some(EstadoPublicacion::Publicado)
}

/// Punto de enganche del pipeline de guardado: ante una transición a
/// publicado, el despacho corre en una tarea aparte y la respuesta del
/// guardado no espera a ningún SMTP.
pub fn despachar_si_nueva_publicacion(
    state: &AppState,
    anterior: Option<EstadoPublicacion>,
    contenido: &Contenido,
) {
    if !es_nueva_publicacion(anterior, contenido.estado) {
        return;
    }
    let pool = state.pool.clone();
    let mailer = Arc::clone(&state.mailer);
    let config = Arc::clone(&state.config);
    let contenido = contenido.clone();
    tokio::spawn(async move {
        match despachar_automatico(&pool, mailer.as_ref(), &config, &contenido).await {
            Ok(Some(resultado)) => tracing::info!(
                "Newsletter de contenido {} despachado: {} enviados, {} errores",
                contenido.id,
                resultado.enviados,
                resultado.errores
            ),
            Ok(None) => tracing::info!(
                "Contenido {} ya tenía newsletter, no se reenvía",
                contenido.id
            ),
            Err(e) => tracing::error!(
                "Fallo despachando newsletter de contenido {}: {:?}",
                contenido.id,
                e
            ),
        }
    });
}

/// Despacho con garantía one-shot: el INSERT condicionado es el marcador de
/// idempotencia persistido, válido entre procesos y reinicios. Si ya existe
/// un newsletter para el contenido, devuelve None sin efectos.
pub async fn despachar_automatico(
    pool: &DbPool,
    mailer: &dyn Mailer,
    config: &AppConfig,
    contenido: &Contenido,
) -> Result<Option<ResultadoEnvio>, NewsletterError> {
    let nuevo_id: Option<i64> = sqlx::query_scalar(
        "INSERT INTO newsletters (contenido_id) \
         SELECT $1 \
         WHERE NOT EXISTS (SELECT 1 FROM newsletters WHERE contenido_id = $1) \
         RETURNING id",
    )
    .bind(contenido.id)
    .fetch_optional(pool)
    .await?;

    let Some(newsletter_id) = nuevo_id else {
        return Ok(None);
    };
    Ok(Some(
        ejecutar_envio(pool, mailer, config, newsletter_id, contenido).await?,
    ))
}

/// Envío manual para un contenido sin newsletter previo (acción de admin).
pub async fn despachar_manual(
    pool: &DbPool,
    mailer: &dyn Mailer,
    config: &AppConfig,
    contenido: &Contenido,
) -> Result<(i64, ResultadoEnvio), NewsletterError> {
    let existente: Option<i64> =
        sqlx::query_scalar("SELECT id FROM newsletters WHERE contenido_id = $1 LIMIT 1")
            .bind(contenido.id)
            .fetch_optional(pool)
            .await?;
    if existente.is_some() {
        return Err(NewsletterError::YaEnviado);
    }

    let newsletter_id: i64 =
        sqlx::query_scalar("INSERT INTO newsletters (contenido_id) VALUES ($1) RETURNING id")
            .bind(contenido.id)
            .fetch_one(pool)
            .await?;
    let resultado = ejecutar_envio(pool, mailer, config, newsletter_id, contenido).await?;
    Ok((newsletter_id, resultado))
}

/// Reenvío: un lote completo nuevo para el mismo contenido, permitido solo
/// si el lote original tuvo errores. No reutiliza la fila vieja.
pub async fn reenviar(
    pool: &DbPool,
    mailer: &dyn Mailer,
    config: &AppConfig,
    newsletter_id: i64,
    contenido: &Contenido,
) -> Result<ResultadoEnvio, NewsletterError> {
    let nuevo_id: i64 =
        sqlx::query_scalar("INSERT INTO newsletters (contenido_id) VALUES ($1) RETURNING id")
            .bind(contenido.id)
            .fetch_one(pool)
            .await?;
    tracing::info!(
        "Reenviando newsletter {} de contenido {} como lote {}",
        newsletter_id,
        contenido.id,
        nuevo_id
    );
    Ok(ejecutar_envio(pool, mailer, config, nuevo_id, contenido).await?)
}

/// Corre el lote para una fila de newsletter ya creada y persiste el
/// agregado (totales, log de errores, bandera de éxito).
async fn ejecutar_envio(
    pool: &DbPool,
    mailer: &dyn Mailer,
    config: &AppConfig,
    newsletter_id: i64,
    contenido: &Contenido,
) -> Result<ResultadoEnvio, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM suscriptores WHERE activo = TRUE AND {} = TRUE",
        COLUMNAS_SUSCRIPTOR,
        contenido.categoria().columna_suscripcion()
    );
    let suscriptores = sqlx::query_as::<_, Suscriptor>(&sql).fetch_all(pool).await?;

    let autor = match contenido.autor_id {
        Some(id) => {
            sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    let lote = enviar_lote(mailer, config, contenido, autor.as_deref(), &suscriptores).await;

    sqlx::query(
        "UPDATE newsletters \
         SET total_enviados = $1, total_errores = $2, log_errores = $3, \
             enviado_exitosamente = $4 \
         WHERE id = $5",
    )
    .bind(lote.enviados)
    .bind(lote.errores)
    .bind(if lote.log.is_empty() {
        None
    } else {
        Some(lote.log.join("\n"))
    })
    .bind(lote.errores == 0)
    .bind(newsletter_id)
    .execute(pool)
    .await?;

    Ok(ResultadoEnvio {
        enviados: lote.enviados,
        errores: lote.errores,
    })
}

struct Lote {
    enviados: i32,
    errores: i32,
    log: Vec<String>,
}

/// Envía a cada suscriptor del lote. Un fallo individual se anota con la
/// dirección y el error, y el lote sigue con el resto.
async fn enviar_lote(
    mailer: &dyn Mailer,
    config: &AppConfig,
    contenido: &Contenido,
    autor: Option<&str>,
    suscriptores: &[Suscriptor],
) -> Lote {
    let asunto = asunto(contenido);
    let mut lote = Lote {
        enviados: 0,
        errores: 0,
        log: Vec::new(),
    };

    for suscriptor in suscriptores {
        // El SQL ya filtra por opt-in, pero el lote no confía en el caller
        if !suscriptor.activo || !suscriptor.esta_suscrito_a(contenido.categoria()) {
            continue;
        }
        let cuerpo = cuerpo_mail(config, contenido, autor, suscriptor);
        match mailer.send(&suscriptor.email, &asunto, &cuerpo).await {
            Ok(()) => lote.enviados += 1,
            Err(e) => {
                lote.errores += 1;
                lote.log.push(format!("{}: {}", suscriptor.email, e));
            }
        }
    }

    lote
}

fn asunto(contenido: &Contenido) -> String {
    format!(
        "Nuevo contenido en {}: {}",
        contenido.categoria().nombre_display(),
        contenido.titulo
    )
}

fn cuerpo_mail(
    config: &AppConfig,
    contenido: &Contenido,
    autor: Option<&str>,
    suscriptor: &Suscriptor,
) -> String {
    format!(
        "Hola {nombre},\n\n\
         Tenemos nuevo contenido en {categoria}:\n\n\
         Título: {titulo}\n\
         Autor: {autor}\n\
         Fecha: {fecha}\n\n\
         Lee el contenido completo en: {site}/contenido/{id}-{slug}\n\n\
         --\n\
         Diario El Gobierno\n\
         {contacto}\n\n\
         Para desuscribirte: {site}/desuscribirse/{token}\n",
        nombre = suscriptor.nombre,
        categoria = contenido.categoria().nombre_display(),
        titulo = contenido.titulo,
        autor = autor.unwrap_or("N/A"),
        fecha = contenido.fecha_publicacion,
        site = config.site_url,
        id = contenido.id,
        slug = contenido.slug,
        contacto = config.smtp.email_contacto,
        token = suscriptor.token_desuscripcion,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImgbbConfig, SmtpConfig};
    use crate::models::contenido::{Categoria, DatosCategoria};
    use crate::services::mailer::MailError;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    struct MailerPrueba {
        rechazar: HashSet<String>,
        enviados: Mutex<Vec<(String, String, String)>>,
    }

    impl MailerPrueba {
        fn nuevo(rechazar: &[&str]) -> Self {
            MailerPrueba {
                rechazar: rechazar.iter().map(|s| s.to_string()).collect(),
                enviados: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Mailer for MailerPrueba {
        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
            if self.rechazar.contains(to) {
                return Err(MailError::Transporte("buzón lleno".to_string()));
            }
            self.enviados.lock().unwrap().push((
                to.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    fn config_prueba() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/test".to_string(),
            puerto: 0,
            site_url: "https://diarioelgobierno.ar".to_string(),
            upload_dir: PathBuf::from("uploads"),
            imgbb: ImgbbConfig {
                api_key: "x".to_string(),
                upload_url: "http://localhost/1/upload".to_string(),
                timeout: Duration::from_secs(1),
                max_intentos: 1,
                espera_base: Duration::from_millis(1),
            },
            smtp: SmtpConfig {
                host: "localhost".to_string(),
                puerto: 587,
                usuario: None,
                password: None,
                remitente: "Diario <noreply@diarioelgobierno.ar>".to_string(),
                email_contacto: "diarioelgobiernoargentina@gmail.com".to_string(),
            },
        }
    }

    fn contenido_news(estado: EstadoPublicacion) -> Contenido {
        Contenido {
            id: 42,
            titulo: "Breaking".to_string(),
            slug: "breaking".to_string(),
            autor_id: Some(1),
            fecha_publicacion: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            estado,
            datos: DatosCategoria::News {
                subtitulos_news: None,
                contenido_news: "Texto".to_string(),
                video_youtube_news: None,
            },
            contador_visitas: 0,
            contador_visitas_total: 0,
            ultima_actualizacion_contador: Utc::now(),
            created_at: None,
            updated_at: None,
        }
    }

    fn suscriptor(email: &str) -> Suscriptor {
        Suscriptor {
            id: 1,
            nombre: "Ana".to_string(),
            email: email.to_string(),
            activo: true,
            token_desuscripcion: Uuid::new_v4(),
            fecha_suscripcion: Utc::now(),
            suscrito_editorials: true,
            suscrito_issues: true,
            suscrito_madeinarg: true,
            suscrito_news: true,
            suscrito_club_pompa: true,
        }
    }

    #[test]
    fn transicion_a_publicado_dispara() {
        use EstadoPublicacion::*;
        assert!(es_nueva_publicacion(Some(Borrador), Publicado));
        assert!(es_nueva_publicacion(Some(ListoParaEditar), Publicado));
        assert!(es_nueva_publicacion(Some(EnPapelera), Publicado));
        // Creación directa en publicado también cuenta
        assert!(es_nueva_publicacion(None, Publicado));
    }

    #[test]
    fn otras_transiciones_no_disparan() {
        use EstadoPublicacion::*;
        assert!(!es_nueva_publicacion(Some(Publicado), Publicado));
        assert!(!es_nueva_publicacion(Some(Publicado), EnPapelera));
        assert!(!es_nueva_publicacion(Some(Borrador), ListoParaEditar));
        assert!(!es_nueva_publicacion(None, Borrador));
    }

    #[tokio::test]
    async fn un_fallo_individual_no_corta_el_lote() {
        let mailer = MailerPrueba::nuevo(&["roto@example.com"]);
        let config = config_prueba();
        let contenido = contenido_news(EstadoPublicacion::Publicado);
        let suscriptores = vec![
            suscriptor("ana@example.com"),
            suscriptor("roto@example.com"),
            suscriptor("bruno@example.com"),
        ];

        let lote = enviar_lote(&mailer, &config, &contenido, Some("redaccion"), &suscriptores).await;

        assert_eq!(lote.enviados, 2);
        assert_eq!(lote.errores, 1);
        assert_eq!(lote.log.len(), 1);
        assert!(lote.log[0].starts_with("roto@example.com:"));

        let enviados = mailer.enviados.lock().unwrap();
        assert_eq!(enviados.len(), 2);
    }

    #[tokio::test]
    async fn el_mail_lleva_link_y_token_de_desuscripcion() {
        let mailer = MailerPrueba::nuevo(&[]);
        let config = config_prueba();
        let contenido = contenido_news(EstadoPublicacion::Publicado);
        let suscriptores = vec![suscriptor("ana@example.com")];
        let token = suscriptores[0].token_desuscripcion;

        let lote = enviar_lote(&mailer, &config, &contenido, None, &suscriptores).await;
        assert_eq!(lote.enviados, 1);

        let enviados = mailer.enviados.lock().unwrap();
        let (to, subject, body) = &enviados[0];
        assert_eq!(to, "ana@example.com");
        assert_eq!(subject, "Nuevo contenido en News: Breaking");
        assert!(body.contains("https://diarioelgobierno.ar/contenido/42-breaking"));
        assert!(body.contains(&format!("/desuscribirse/{}", token)));
        assert!(body.contains("Autor: N/A"));
    }

    #[test]
    fn filtro_de_opt_in_por_categoria() {
        let mut s = suscriptor("ana@example.com");
        s.suscrito_news = false;
        assert!(!s.esta_suscrito_a(Categoria::News));
        assert!(s.esta_suscrito_a(Categoria::Issues));
    }
}
