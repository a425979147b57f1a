use axum::{
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::models::user::{Claims, ROL_ADMIN};

fn decodificar_claims(token: &str) -> Result<Claims, StatusCode> {
    let secret = std::env::var("JWT_SECRET").map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let validation = Validation::default();
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    // Token falso, expirado o manipulado
    .map_err(|_| StatusCode::UNAUTHORIZED)
}

// Corre ANTES de los handlers de editores: valida el token y deja los
// claims en las extensions para que el handler sepa quién es el usuario
pub async fn auth_middleware(
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = decodificar_claims(auth.token())?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

// Igual que el anterior, pero además exige rol de admin
pub async fn admin_middleware(
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = decodificar_claims(auth.token())?;
    if claims.role != ROL_ADMIN {
        // Editor intentando una ruta de admin: 403 (Prohibido)
        return Err(StatusCode::FORBIDDEN);
    }
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
