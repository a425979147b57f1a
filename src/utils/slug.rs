use crate::db::DbPool;

pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut prev_hyphen = false;

    for ch in input.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    while slug.starts_with('-') {
        slug.remove(0);
    }

    slug
}

/// Deriva un slug único a partir del título: si la base ya existe, prueba
/// `base-1`, `base-2`, ... hasta encontrar uno libre. El índice único sobre
/// la columna cubre la carrera entre dos creaciones simultáneas (el insert
/// reintenta con un slug nuevo si pierde).
pub async fn generar_slug_unico(pool: &DbPool, titulo: &str) -> Result<String, sqlx::Error> {
    let mut base = slugify(titulo);
    if base.is_empty() {
        base = format!("contenido-{}", uuid::Uuid::new_v4().simple());
    }

    let existentes: Vec<String> = sqlx::query_scalar(
        "SELECT slug FROM contenidos WHERE slug = $1 OR slug LIKE $1 || '-%'",
    )
    .bind(&base)
    .fetch_all(pool)
    .await?;

    Ok(primer_slug_libre(&base, &existentes))
}

fn primer_slug_libre(base: &str, existentes: &[String]) -> String {
    if !existentes.iter().any(|s| s == base) {
        return base.to_string();
    }
    let mut n = 1u32;
    loop {
        let candidato = format!("{}-{}", base, n);
        if !existentes.iter().any(|s| s == &candidato) {
            return candidato;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basico() {
        assert_eq!(slugify("Mi Nota"), "mi-nota");
        assert_eq!(slugify("  Hola,   Mundo!  "), "hola-mundo");
        assert_eq!(slugify("Issue #12: Primavera"), "issue-12-primavera");
    }

    #[test]
    fn slugify_vacio() {
        assert_eq!(slugify("¡¡¡"), "");
    }

    #[test]
    fn sufijo_incremental_hasta_libre() {
        let existentes = vec!["mi-nota".to_string()];
        assert_eq!(primer_slug_libre("mi-nota", &existentes), "mi-nota-1");

        let existentes = vec![
            "mi-nota".to_string(),
            "mi-nota-1".to_string(),
            "mi-nota-2".to_string(),
        ];
        assert_eq!(primer_slug_libre("mi-nota", &existentes), "mi-nota-3");
    }

    #[test]
    fn sin_colision_devuelve_base() {
        assert_eq!(primer_slug_libre("mi-nota", &[]), "mi-nota");
        // Un slug parecido pero distinto no fuerza sufijo
        let existentes = vec!["mi-nota-vieja".to_string()];
        assert_eq!(primer_slug_libre("mi-nota", &existentes), "mi-nota");
    }
}
