pub mod auth;
pub mod contenido;
pub mod media;
pub mod newsletter;
pub mod suscriptor;
