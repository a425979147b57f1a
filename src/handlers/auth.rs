use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::{
    models::user::{AuthResponse, Claims, LoginPayload, RegisterPayload, User, ROL_ADMIN, ROL_EDITOR},
    state::AppState,
    utils::security::{hash_password, verify_password},
};

// POST /api/auth/register (Solo admins; el primer usuario se permite sin token y queda como admin)
pub async fn register_handler(
    State(state): State<AppState>,
    // Token opcional: si ya existe un usuario, exigimos que sea admin
    maybe_auth: Option<TypedHeader<Authorization<Bearer>>>,
    Json(payload): Json<RegisterPayload>,
) -> impl IntoResponse {
    // Contamos usuarios existentes para decidir si es bootstrap
    let user_count: i64 = match sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.pool)
        .await
    {
        Ok(count) => count,
        Err(e) => {
            tracing::error!("Error contando usuarios: {:?}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Si ya hay usuarios, exigimos token admin
    if user_count > 0 {
        let TypedHeader(auth_header) = match maybe_auth {
            Some(h) => h,
            None => {
                return (StatusCode::FORBIDDEN, "Solo un admin puede crear usuarios")
                    .into_response()
            }
        };

        let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET debe estar en .env");
        let token = auth_header.token();
        let validation = jsonwebtoken::Validation::default();
        let token_data = jsonwebtoken::decode::<Claims>(
            token,
            &jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        );

        match token_data {
            Ok(data) => {
                if data.claims.role != ROL_ADMIN {
                    return (StatusCode::FORBIDDEN, "Solo un admin puede crear usuarios")
                        .into_response();
                }
            }
            Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    // 1. Hashear la contraseña (nunca guardarla plana)
    let hashed_password = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error de seguridad").into_response()
        }
    };

    // Rol: el primer usuario se vuelve admin automáticamente; el resto, editor
    let role = if user_count == 0 { ROL_ADMIN } else { ROL_EDITOR };

    // 2. Insertar en Base de Datos
    let result = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash, role) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, username, email, password_hash, role",
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(role)
    .fetch_one(&state.pool)
    .await;

    match result {
        Ok(_) => (StatusCode::CREATED, "Usuario creado exitosamente").into_response(),
        Err(e) => {
            tracing::error!("Error creando usuario: {:?}", e);
            // Probablemente el email ya existe
            (StatusCode::CONFLICT, "El usuario o email ya existe").into_response()
        }
    }
}

// POST /api/auth/login
pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> impl IntoResponse {
    // 1. Buscar usuario por email
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, role FROM users WHERE email = $1",
    )
    .bind(&payload.email)
    .fetch_optional(&state.pool)
    .await
    .unwrap_or(None);

    let user = match user {
        Some(u) => u,
        None => return (StatusCode::UNAUTHORIZED, "Credenciales inválidas").into_response(),
    };

    // 2. Verificar contraseña (Argon2)
    let is_valid = verify_password(&payload.password, &user.password_hash);

    if !is_valid {
        return (StatusCode::UNAUTHORIZED, "Credenciales inválidas").into_response();
    }

    // 3. Generar JWT con expiración de 24 horas
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .expect("Fecha inválida")
        .timestamp() as usize;

    let claims = Claims {
        sub: user.email.clone(),
        exp: expiration,
        iat: Utc::now().timestamp() as usize,
        user_id: user.id,
        role: user.role,
    };

    let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET debe estar en .env");

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    );

    match token {
        Ok(t) => (
            StatusCode::OK,
            Json(AuthResponse {
                token: t,
                token_type: "Bearer".to_string(),
            }),
        )
            .into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Error generando token").into_response(),
    }
}
