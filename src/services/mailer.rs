use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Dirección de correo inválida: {0}")]
    Direccion(String),
    #[error("Fallo del transporte SMTP: {0}")]
    Transporte(String),
    #[error("El envío de correo está deshabilitado (faltan credenciales SMTP)")]
    Deshabilitado,
}

/// El colaborador de correo que usa el fan-out del newsletter. El trait
/// permite un transporte de prueba en los tests.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    remitente: Mailbox,
}

impl SmtpMailer {
    /// Construye el transporte desde la configuración. Sin credenciales no
    /// hay mailer: el arranque sigue y los envíos quedan deshabilitados.
    pub fn desde_config(config: &SmtpConfig) -> Option<SmtpMailer> {
        let (usuario, password) = match (&config.usuario, &config.password) {
            (Some(u), Some(p)) => (u.clone(), p.clone()),
            _ => {
                tracing::warn!(
                    "Newsletter deshabilitado: faltan SMTP_USERNAME/SMTP_PASSWORD en .env"
                );
                return None;
            }
        };

        let remitente: Mailbox = match config.remitente.parse() {
            Ok(m) => m,
            Err(e) => {
                tracing::error!("SMTP_FROM inválido '{}': {}", config.remitente, e);
                return None;
            }
        };

        // Puerto 465 es TLS implícito; el resto arranca con STARTTLS
        let builder = if config.puerto == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        };
        let transport = match builder {
            Ok(b) => b
                .port(config.puerto)
                .credentials(Credentials::new(usuario, password))
                // Un SMTP colgado no puede demorar un lote para siempre
                .timeout(Some(std::time::Duration::from_secs(30)))
                .build(),
            Err(e) => {
                tracing::error!("Host SMTP inválido '{}': {}", config.host, e);
                return None;
            }
        };

        Some(SmtpMailer {
            transport,
            remitente,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let destinatario: Mailbox = to
            .parse()
            .map_err(|_| MailError::Direccion(to.to_string()))?;
        let mensaje = Message::builder()
            .from(self.remitente.clone())
            .to(destinatario)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| MailError::Transporte(e.to_string()))?;
        self.transport
            .send(mensaje)
            .await
            .map_err(|e| MailError::Transporte(e.to_string()))?;
        Ok(())
    }
}

/// Reemplazo cuando no hay credenciales configuradas: cada envío falla de
/// forma explícita y el error queda en el log del newsletter, visible para
/// el operador.
pub struct MailerDeshabilitado;

#[async_trait]
impl Mailer for MailerDeshabilitado {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), MailError> {
        Err(MailError::Deshabilitado)
    }
}
