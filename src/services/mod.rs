pub mod contenido;
pub mod imgbb;
pub mod mailer;
pub mod media;
pub mod newsletter;
pub mod visitas;
