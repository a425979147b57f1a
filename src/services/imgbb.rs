use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ImgbbConfig;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("ImgBB rechazó por límite de peticiones (429) tras {0} intentos")]
    RateLimited(u32),
    #[error("ImgBB devolvió error: {0}")]
    Api(String),
    #[error("HTTP {status} al subir imagen a ImgBB: {cuerpo}")]
    Http { status: u16, cuerpo: String },
    #[error("Error de transporte hacia ImgBB: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ImgbbRespuesta {
    success: Option<bool>,
    data: Option<ImgbbData>,
    error: Option<ImgbbCuerpoError>,
}

#[derive(Debug, Deserialize)]
struct ImgbbData {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ImgbbCuerpoError {
    message: Option<String>,
}

/// Cliente del host externo de imágenes. La credencial y los límites de
/// reintento llegan por configuración, nunca como constantes de módulo.
pub struct ImgbbClient {
    http: reqwest::Client,
    config: ImgbbConfig,
}

impl ImgbbClient {
    pub fn new(config: ImgbbConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("No se pudo construir el cliente HTTP para ImgBB");
        ImgbbClient { http, config }
    }

    /// Sube una imagen y devuelve la URL remota. Ante un 429 espera con
    /// back-off exponencial hasta `max_intentos`; nunca duerme sin límite.
    pub async fn upload(&self, imagen: &[u8]) -> Result<String, UploadError> {
        let imagen_base64 = base64::engine::general_purpose::STANDARD.encode(imagen);
        let mut intento: u32 = 0;

        loop {
            intento += 1;
            let respuesta = self
                .http
                .post(&self.config.upload_url)
                .form(&[
                    ("key", self.config.api_key.as_str()),
                    ("image", imagen_base64.as_str()),
                ])
                .send()
                .await?;

            let status = respuesta.status();
            if status.as_u16() == 429 {
                if intento >= self.config.max_intentos {
                    return Err(UploadError::RateLimited(intento));
                }
                let espera = self.config.espera_base * 2u32.pow(intento - 1);
                tracing::warn!(
                    "ImgBB devolvió 429, reintentando en {:?} (intento {}/{})",
                    espera,
                    intento,
                    self.config.max_intentos
                );
                tokio::time::sleep(espera).await;
                continue;
            }

            if !status.is_success() {
                // Conservamos el cuerpo crudo para el log del operador
                let cuerpo = respuesta.text().await.unwrap_or_default();
                return Err(UploadError::Http {
                    status: status.as_u16(),
                    cuerpo,
                });
            }

            let cuerpo: ImgbbRespuesta = respuesta.json().await?;
            if cuerpo.success == Some(true) {
                if let Some(data) = cuerpo.data {
                    return Ok(data.url);
                }
            }
            let mensaje = cuerpo
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Error desconocido".to_string());
            return Err(UploadError::Api(mensaje));
        }
    }

    /// ImgBB no expone una API de borrado: la llamada queda registrada para
    /// el operador y se da por exitosa. La imagen sigue viva del lado remoto;
    /// es una limitación aceptada, no un bug.
    pub async fn delete(&self, url: &str) -> bool {
        tracing::warn!(
            "ImgBB no permite eliminar imágenes vía API. Imagen: {}",
            url
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_de_prueba(server: &MockServer) -> ImgbbConfig {
        ImgbbConfig {
            api_key: "clave-de-prueba".to_string(),
            upload_url: format!("{}/1/upload", server.uri()),
            timeout: Duration::from_secs(5),
            max_intentos: 3,
            espera_base: Duration::from_millis(5),
        }
    }

    fn respuesta_ok(url: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "url": url }
        }))
    }

    #[tokio::test]
    async fn upload_exitoso_devuelve_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/upload"))
            .respond_with(respuesta_ok("https://i.ibb.co/abc/foto.jpg"))
            .expect(1)
            .mount(&server)
            .await;

        let cliente = ImgbbClient::new(config_de_prueba(&server));
        let url = cliente.upload(b"bytes-de-imagen").await.unwrap();
        assert_eq!(url, "https://i.ibb.co/abc/foto.jpg");
    }

    #[tokio::test]
    async fn reintenta_tras_429_y_termina_bien() {
        let server = MockServer::start().await;
        // El primer intento recibe 429; el siguiente, la respuesta normal.
        Mock::given(method("POST"))
            .and(path("/1/upload"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/1/upload"))
            .respond_with(respuesta_ok("https://i.ibb.co/xyz/foto.jpg"))
            .mount(&server)
            .await;

        let cliente = ImgbbClient::new(config_de_prueba(&server));
        let url = cliente.upload(b"bytes").await.unwrap();
        assert_eq!(url, "https://i.ibb.co/xyz/foto.jpg");
    }

    #[tokio::test]
    async fn rate_limit_persistente_corta_con_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/upload"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let cliente = ImgbbClient::new(config_de_prueba(&server));
        match cliente.upload(b"bytes").await {
            Err(UploadError::RateLimited(intentos)) => assert_eq!(intentos, 3),
            otro => panic!("se esperaba RateLimited, llegó {:?}", otro.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn error_de_api_conserva_el_mensaje() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error": { "message": "Invalid API key" }
            })))
            .mount(&server)
            .await;

        let cliente = ImgbbClient::new(config_de_prueba(&server));
        match cliente.upload(b"bytes").await {
            Err(UploadError::Api(mensaje)) => assert_eq!(mensaje, "Invalid API key"),
            otro => panic!("se esperaba Api, llegó {:?}", otro.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn http_no_exitoso_conserva_el_diagnostico() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/upload"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom interno"))
            .mount(&server)
            .await;

        let cliente = ImgbbClient::new(config_de_prueba(&server));
        match cliente.upload(b"bytes").await {
            Err(UploadError::Http { status, cuerpo }) => {
                assert_eq!(status, 500);
                assert_eq!(cuerpo, "boom interno");
            }
            otro => panic!("se esperaba Http, llegó {:?}", otro.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn delete_es_no_op_documentado() {
        let server = MockServer::start().await;
        let cliente = ImgbbClient::new(config_de_prueba(&server));
        assert!(cliente.delete("https://i.ibb.co/abc/foto.jpg").await);
    }
}
