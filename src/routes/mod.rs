use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::services::ServeDir;

use crate::{
    handlers::{auth, contenido, media, newsletter, suscriptor},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

pub fn create_routes(state: AppState) -> Router {
    let upload_dir = state.config.upload_dir.clone();

    // 1. Rutas Públicas (Todo el mundo)
    let public_routes = Router::new()
        .route("/api/categorias", get(contenido::listar_categorias_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/contenidos", get(contenido::listar_contenidos_handler))
        .route("/api/contenidos/mas-vistas", get(contenido::mas_vistas_handler))
        .route("/api/contenidos/mas-leidas", get(contenido::mas_leidas_handler))
        .route("/api/contenidos/recientes", get(contenido::recientes_handler))
        .route("/api/contenidos/:id", get(contenido::get_contenido_handler))
        .route("/api/contenidos/:id/visita", post(contenido::registrar_visita_handler))
        .route("/api/contenidos/:id/imagenes", get(media::emitir_imagenes_handler))
        .route("/api/suscriptores/suscribirse", post(suscriptor::suscribirse_handler))
        .route("/api/suscriptores/desuscribirse", post(suscriptor::desuscribirse_handler))
        .route("/api/suscriptores/preferencias", post(suscriptor::actualizar_preferencias_handler))
        .nest_service("/uploads", ServeDir::new(upload_dir));

    // 2. Rutas de Editores (Crear, Editar, Subir Fotos) - Requieren Auth Básico
    let editor_routes = Router::new()
        .route("/api/contenidos", post(contenido::crear_contenido_handler))
        .route("/api/contenidos/:id", put(contenido::actualizar_contenido_handler))
        .route("/api/contenidos/:id/duplicar", post(contenido::duplicar_contenido_handler))
        .route("/api/contenidos/:id/imagenes/:indice", post(media::recibir_imagen_handler))
        .route("/api/upload", post(media::upload_directo_handler))
        .route_layer(middleware::from_fn(auth_middleware));

    // 3. Rutas de ADMIN (Estados, Borrado, Newsletter) - Requieren Auth de Admin
    let admin_routes = Router::new()
        .route("/api/admin/contenidos/:id/estado", post(contenido::cambiar_estado_handler))
        .route("/api/contenidos/:id", delete(contenido::eliminar_contenido_handler))
        .route("/api/admin/contenidos/:id/definitivo", delete(contenido::eliminar_definitivo_handler))
        .route("/api/admin/contenidos/reset-contadores", post(contenido::reset_contadores_handler))
        .route("/api/admin/suscriptores", get(suscriptor::listar_suscriptores_handler))
        .route("/api/admin/suscriptores/estadisticas", get(suscriptor::estadisticas_suscriptores_handler))
        .route("/api/admin/newsletters", get(newsletter::listar_newsletters_handler))
        .route("/api/admin/newsletters/:id/reenviar", post(newsletter::reenviar_newsletter_handler))
        .route("/api/admin/newsletters/enviar-manual", post(newsletter::enviar_manual_handler))
        .route_layer(middleware::from_fn(admin_middleware));

    // Fusionamos todo
    Router::new()
        .merge(public_routes)
        .merge(editor_routes)
        .merge(admin_routes)
        .with_state(state)
}
