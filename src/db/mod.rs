use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

// Definimos un alias para "Pool<Postgres>"
pub type DbPool = Pool<Postgres>;

pub async fn init_db(database_url: &str) -> DbPool {
    // Creamos el pool de conexiones
    PgPoolOptions::new()
        .max_connections(5) // Máximo 5 conexiones simultáneas (ajustable)
        .connect(database_url)
        .await
        .expect("Error al conectar a la Base de Datos. ¿Está corriendo Postgres?")
}
