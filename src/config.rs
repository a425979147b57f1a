use std::env;
use std::path::PathBuf;
use std::time::Duration;

// Configuración tipada, leída una sola vez al arrancar y compartida vía el
// estado de axum. La API key de ImgBB y las credenciales SMTP viajan acá,
// nunca como constantes de módulo.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub puerto: u16,
    pub site_url: String,
    pub upload_dir: PathBuf,
    pub imgbb: ImgbbConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone)]
pub struct ImgbbConfig {
    pub api_key: String,
    pub upload_url: String,
    /// Tiempo máximo por petición al host externo.
    pub timeout: Duration,
    /// Intentos máximos ante un 429 antes de rendirse.
    pub max_intentos: u32,
    /// Espera inicial del back-off exponencial.
    pub espera_base: Duration,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub puerto: u16,
    pub usuario: Option<String>,
    pub password: Option<String>,
    pub remitente: String,
    pub email_contacto: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url =
            env::var("DATABASE_URL").expect("DATABASE_URL no está definido en .env");
        let puerto = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);
        let site_url = env::var("SITE_URL")
            .unwrap_or_else(|_| "https://diarioelgobierno.ar".to_string())
            .trim_end_matches('/')
            .to_string();
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let imgbb = ImgbbConfig {
            api_key: env::var("IMGBB_API_KEY").expect("IMGBB_API_KEY no está definido en .env"),
            upload_url: env::var("IMGBB_UPLOAD_URL")
                .unwrap_or_else(|_| "https://api.imgbb.com/1/upload".to_string()),
            timeout: Duration::from_secs(30),
            max_intentos: 3,
            espera_base: Duration::from_millis(500),
        };

        let smtp = SmtpConfig {
            host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            puerto: env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            usuario: env::var("SMTP_USERNAME").ok().filter(|v| !v.trim().is_empty()),
            password: env::var("SMTP_PASSWORD").ok().filter(|v| !v.trim().is_empty()),
            remitente: env::var("SMTP_FROM")
                .unwrap_or_else(|_| "Diario El Gobierno <noreply@diarioelgobierno.ar>".to_string()),
            email_contacto: env::var("EMAIL_CONTACTO")
                .unwrap_or_else(|_| "diarioelgobiernoargentina@gmail.com".to_string()),
        };

        AppConfig {
            database_url,
            puerto,
            site_url,
            upload_dir,
            imgbb,
            smtp,
        }
    }
}
