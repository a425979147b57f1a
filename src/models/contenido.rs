use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::ContenidoError;

/// Máximo de espacios de imagen por contenido (y por galería de backstage).
pub const MAX_SLOTS: i32 = 30;

// ==================== CATEGORÍAS Y ESTADOS ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Categoria {
    Editorials,
    Issues,
    Madeinarg,
    News,
    ClubPompa,
}

impl Categoria {
    pub const TODAS: [Categoria; 5] = [
        Categoria::Editorials,
        Categoria::Issues,
        Categoria::Madeinarg,
        Categoria::News,
        Categoria::ClubPompa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Categoria::Editorials => "editorials",
            Categoria::Issues => "issues",
            Categoria::Madeinarg => "madeinarg",
            Categoria::News => "news",
            Categoria::ClubPompa => "club_pompa",
        }
    }

    pub fn nombre_display(&self) -> &'static str {
        match self {
            Categoria::Editorials => "Editorials",
            Categoria::Issues => "Issues",
            Categoria::Madeinarg => "Made in Argentina",
            Categoria::News => "News",
            Categoria::ClubPompa => "Club Pompa",
        }
    }

    /// Columna booleana de `suscriptores` que controla el opt-in para esta
    /// categoría.
    pub fn columna_suscripcion(&self) -> &'static str {
        match self {
            Categoria::Editorials => "suscrito_editorials",
            Categoria::Issues => "suscrito_issues",
            Categoria::Madeinarg => "suscrito_madeinarg",
            Categoria::News => "suscrito_news",
            Categoria::ClubPompa => "suscrito_club_pompa",
        }
    }

    pub fn parse(valor: &str) -> Option<Categoria> {
        match valor.trim().to_lowercase().as_str() {
            "editorials" => Some(Categoria::Editorials),
            "issues" => Some(Categoria::Issues),
            "madeinarg" => Some(Categoria::Madeinarg),
            "news" => Some(Categoria::News),
            "club_pompa" => Some(Categoria::ClubPompa),
            _ => None,
        }
    }
}

// La comparación de estados es siempre sobre el enum, nunca sobre strings
// crudos: el parse normaliza mayúsculas para que 'Publicado' y 'publicado'
// sean el mismo estado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoPublicacion {
    Borrador,
    EnPapelera,
    Publicado,
    ListoParaEditar,
}

impl EstadoPublicacion {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoPublicacion::Borrador => "borrador",
            EstadoPublicacion::EnPapelera => "en_papelera",
            EstadoPublicacion::Publicado => "publicado",
            EstadoPublicacion::ListoParaEditar => "listo_para_editar",
        }
    }

    pub fn parse(valor: &str) -> Option<EstadoPublicacion> {
        match valor.trim().to_lowercase().as_str() {
            "borrador" => Some(EstadoPublicacion::Borrador),
            "en_papelera" => Some(EstadoPublicacion::EnPapelera),
            "publicado" => Some(EstadoPublicacion::Publicado),
            "listo_para_editar" => Some(EstadoPublicacion::ListoParaEditar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubcategoriaMadeinarg {
    Calzado,
    Indumentaria,
    Accesorios,
    Otro,
}

impl SubcategoriaMadeinarg {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubcategoriaMadeinarg::Calzado => "calzado",
            SubcategoriaMadeinarg::Indumentaria => "indumentaria",
            SubcategoriaMadeinarg::Accesorios => "accesorios",
            SubcategoriaMadeinarg::Otro => "otro",
        }
    }

    pub fn parse(valor: &str) -> Option<SubcategoriaMadeinarg> {
        match valor.trim().to_lowercase().as_str() {
            "calzado" => Some(SubcategoriaMadeinarg::Calzado),
            "indumentaria" => Some(SubcategoriaMadeinarg::Indumentaria),
            "accesorios" => Some(SubcategoriaMadeinarg::Accesorios),
            "otro" => Some(SubcategoriaMadeinarg::Otro),
            _ => None,
        }
    }
}

// ==================== DATOS POR CATEGORÍA ====================

/// Carga específica de cada categoría. Las cinco variantes comparten la base
/// común de `Contenido`; los campos que no pertenecen a la categoría
/// declarada directamente no existen en el tipo.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "categoria", rename_all = "snake_case")]
pub enum DatosCategoria {
    Editorials,
    Issues {
        numero_issue: Option<i32>,
        nombre_modelo: String,
        subtitulo_issue: Option<String>,
        frase_final_issue: Option<String>,
        video_youtube_issue: Option<String>,
    },
    Madeinarg {
        subcategoria_madeinarg: SubcategoriaMadeinarg,
        subtitulo_madeinarg: Option<String>,
        tags_marcas: Vec<String>,
    },
    News {
        subtitulos_news: Option<String>,
        contenido_news: String,
        video_youtube_news: Option<String>,
    },
    ClubPompa,
}

/// Proyección plana de los campos por categoría, tal como viven en la fila
/// de `contenidos` y en los payloads de entrada.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CamposCategoria {
    pub numero_issue: Option<i32>,
    pub nombre_modelo: Option<String>,
    pub subtitulo_issue: Option<String>,
    pub frase_final_issue: Option<String>,
    pub video_youtube_issue: Option<String>,
    pub subcategoria_madeinarg: Option<String>,
    pub subtitulo_madeinarg: Option<String>,
    pub tags_marcas: Option<String>,
    pub subtitulos_news: Option<String>,
    pub contenido_news: Option<String>,
    pub video_youtube_news: Option<String>,
}

impl CamposCategoria {
    /// Mezcla para updates parciales: los campos presentes en `nuevos` pisan
    /// a los existentes, los ausentes se conservan.
    pub fn mezclar(mut self, nuevos: CamposCategoria) -> CamposCategoria {
        macro_rules! pisar {
            ($campo:ident) => {
                if nuevos.$campo.is_some() {
                    self.$campo = nuevos.$campo;
                }
            };
        }
        pisar!(numero_issue);
        pisar!(nombre_modelo);
        pisar!(subtitulo_issue);
        pisar!(frase_final_issue);
        pisar!(video_youtube_issue);
        pisar!(subcategoria_madeinarg);
        pisar!(subtitulo_madeinarg);
        pisar!(tags_marcas);
        pisar!(subtitulos_news);
        pisar!(contenido_news);
        pisar!(video_youtube_news);
        self
    }
}

fn separar_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl DatosCategoria {
    /// Validación estricta previa a persistir: cada categoría exige sus
    /// campos y el resto queda inerte. Un faltante bloquea el guardado.
    pub fn validar(
        categoria: Categoria,
        campos: CamposCategoria,
    ) -> Result<DatosCategoria, ContenidoError> {
        match categoria {
            Categoria::Editorials => Ok(DatosCategoria::Editorials),
            Categoria::ClubPompa => Ok(DatosCategoria::ClubPompa),
            Categoria::Issues => {
                let nombre_modelo = campos
                    .nombre_modelo
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ContenidoError::Validacion(
                            "nombre_modelo: Este campo es requerido para Issues.".to_string(),
                        )
                    })?;
                Ok(DatosCategoria::Issues {
                    numero_issue: campos.numero_issue,
                    nombre_modelo,
                    subtitulo_issue: campos.subtitulo_issue,
                    frase_final_issue: campos.frase_final_issue,
                    video_youtube_issue: campos.video_youtube_issue,
                })
            }
            Categoria::Madeinarg => {
                let crudo = campos
                    .subcategoria_madeinarg
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        ContenidoError::Validacion(
                            "subcategoria_madeinarg: Este campo es requerido para MadeInArg."
                                .to_string(),
                        )
                    })?;
                let subcategoria = SubcategoriaMadeinarg::parse(crudo).ok_or_else(|| {
                    ContenidoError::Validacion(format!(
                        "subcategoria_madeinarg inválida: '{}'. Opciones: calzado, indumentaria, accesorios, otro",
                        crudo
                    ))
                })?;
                Ok(DatosCategoria::Madeinarg {
                    subcategoria_madeinarg: subcategoria,
                    subtitulo_madeinarg: campos.subtitulo_madeinarg,
                    tags_marcas: separar_tags(campos.tags_marcas.as_deref()),
                })
            }
            Categoria::News => {
                let contenido_news = campos
                    .contenido_news
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ContenidoError::Validacion(
                            "contenido_news: Este campo es requerido para News.".to_string(),
                        )
                    })?;
                Ok(DatosCategoria::News {
                    subtitulos_news: campos.subtitulos_news,
                    contenido_news,
                    video_youtube_news: campos.video_youtube_news,
                })
            }
        }
    }

    /// Mapeo tolerante desde una fila ya persistida (los datos históricos
    /// pueden tener huecos; la validación estricta corre solo al escribir).
    pub fn desde_fila(categoria: Categoria, campos: CamposCategoria) -> DatosCategoria {
        match categoria {
            Categoria::Editorials => DatosCategoria::Editorials,
            Categoria::ClubPompa => DatosCategoria::ClubPompa,
            Categoria::Issues => DatosCategoria::Issues {
                numero_issue: campos.numero_issue,
                nombre_modelo: campos.nombre_modelo.unwrap_or_default(),
                subtitulo_issue: campos.subtitulo_issue,
                frase_final_issue: campos.frase_final_issue,
                video_youtube_issue: campos.video_youtube_issue,
            },
            Categoria::Madeinarg => DatosCategoria::Madeinarg {
                subcategoria_madeinarg: campos
                    .subcategoria_madeinarg
                    .as_deref()
                    .and_then(SubcategoriaMadeinarg::parse)
                    .unwrap_or(SubcategoriaMadeinarg::Otro),
                subtitulo_madeinarg: campos.subtitulo_madeinarg,
                tags_marcas: separar_tags(campos.tags_marcas.as_deref()),
            },
            Categoria::News => DatosCategoria::News {
                subtitulos_news: campos.subtitulos_news,
                contenido_news: campos.contenido_news.unwrap_or_default(),
                video_youtube_news: campos.video_youtube_news,
            },
        }
    }

    /// Proyección inversa para armar los binds del INSERT/UPDATE.
    pub fn a_campos(&self) -> CamposCategoria {
        let mut campos = CamposCategoria::default();
        match self {
            DatosCategoria::Editorials | DatosCategoria::ClubPompa => {}
            DatosCategoria::Issues {
                numero_issue,
                nombre_modelo,
                subtitulo_issue,
                frase_final_issue,
                video_youtube_issue,
            } => {
                campos.numero_issue = *numero_issue;
                campos.nombre_modelo = Some(nombre_modelo.clone());
                campos.subtitulo_issue = subtitulo_issue.clone();
                campos.frase_final_issue = frase_final_issue.clone();
                campos.video_youtube_issue = video_youtube_issue.clone();
            }
            DatosCategoria::Madeinarg {
                subcategoria_madeinarg,
                subtitulo_madeinarg,
                tags_marcas,
            } => {
                campos.subcategoria_madeinarg = Some(subcategoria_madeinarg.as_str().to_string());
                campos.subtitulo_madeinarg = subtitulo_madeinarg.clone();
                if !tags_marcas.is_empty() {
                    campos.tags_marcas = Some(tags_marcas.join(", "));
                }
            }
            DatosCategoria::News {
                subtitulos_news,
                contenido_news,
                video_youtube_news,
            } => {
                campos.subtitulos_news = subtitulos_news.clone();
                campos.contenido_news = Some(contenido_news.clone());
                campos.video_youtube_news = video_youtube_news.clone();
            }
        }
        campos
    }

    pub fn categoria(&self) -> Categoria {
        match self {
            DatosCategoria::Editorials => Categoria::Editorials,
            DatosCategoria::Issues { .. } => Categoria::Issues,
            DatosCategoria::Madeinarg { .. } => Categoria::Madeinarg,
            DatosCategoria::News { .. } => Categoria::News,
            DatosCategoria::ClubPompa => Categoria::ClubPompa,
        }
    }
}

// ==================== CONTENIDO ====================

/// El agregado principal: base común + carga por categoría.
#[derive(Debug, Clone, Serialize)]
pub struct Contenido {
    pub id: i64,
    pub titulo: String,
    pub slug: String,
    pub autor_id: Option<i64>,
    pub fecha_publicacion: NaiveDate,
    pub estado: EstadoPublicacion,
    #[serde(flatten)]
    pub datos: DatosCategoria,
    pub contador_visitas: i32,
    pub contador_visitas_total: i32,
    pub ultima_actualizacion_contador: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Contenido {
    pub fn categoria(&self) -> Categoria {
        self.datos.categoria()
    }
}

/// Lista de columnas que `ContenidoRow` espera; se interpola en los SELECT
/// para no repetirla en cada handler.
pub const COLUMNAS_CONTENIDO: &str = "id, categoria, titulo, slug, autor_id, fecha_publicacion, \
     estado, numero_issue, nombre_modelo, subtitulo_issue, frase_final_issue, \
     video_youtube_issue, subcategoria_madeinarg, subtitulo_madeinarg, tags_marcas, \
     subtitulos_news, contenido_news, video_youtube_news, contador_visitas, \
     contador_visitas_total, ultima_actualizacion_contador, created_at, updated_at";

/// Fila cruda de `contenidos` tal como la devuelve Postgres.
#[derive(Debug, FromRow)]
pub struct ContenidoRow {
    pub id: i64,
    pub categoria: String,
    pub titulo: String,
    pub slug: String,
    pub autor_id: Option<i64>,
    pub fecha_publicacion: NaiveDate,
    pub estado: String,
    pub numero_issue: Option<i32>,
    pub nombre_modelo: Option<String>,
    pub subtitulo_issue: Option<String>,
    pub frase_final_issue: Option<String>,
    pub video_youtube_issue: Option<String>,
    pub subcategoria_madeinarg: Option<String>,
    pub subtitulo_madeinarg: Option<String>,
    pub tags_marcas: Option<String>,
    pub subtitulos_news: Option<String>,
    pub contenido_news: Option<String>,
    pub video_youtube_news: Option<String>,
    pub contador_visitas: i32,
    pub contador_visitas_total: i32,
    pub ultima_actualizacion_contador: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContenidoRow {
    pub fn into_contenido(self) -> Contenido {
        // Una categoría desconocida en datos viejos degrada a editorials en
        // lugar de tirar el read-path completo.
        let categoria = Categoria::parse(&self.categoria).unwrap_or(Categoria::Editorials);
        let estado =
            EstadoPublicacion::parse(&self.estado).unwrap_or(EstadoPublicacion::Borrador);
        let campos = CamposCategoria {
            numero_issue: self.numero_issue,
            nombre_modelo: self.nombre_modelo,
            subtitulo_issue: self.subtitulo_issue,
            frase_final_issue: self.frase_final_issue,
            video_youtube_issue: self.video_youtube_issue,
            subcategoria_madeinarg: self.subcategoria_madeinarg,
            subtitulo_madeinarg: self.subtitulo_madeinarg,
            tags_marcas: self.tags_marcas,
            subtitulos_news: self.subtitulos_news,
            contenido_news: self.contenido_news,
            video_youtube_news: self.video_youtube_news,
        };
        Contenido {
            id: self.id,
            titulo: self.titulo,
            slug: self.slug,
            autor_id: self.autor_id,
            fecha_publicacion: self.fecha_publicacion,
            estado,
            datos: DatosCategoria::desde_fila(categoria, campos),
            contador_visitas: self.contador_visitas,
            contador_visitas_total: self.contador_visitas_total,
            ultima_actualizacion_contador: self.ultima_actualizacion_contador,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// ==================== MEDIA SLOTS ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoMedia {
    Galeria,
    Backstage,
}

impl TipoMedia {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoMedia::Galeria => "galeria",
            TipoMedia::Backstage => "backstage",
        }
    }

    pub fn parse(valor: &str) -> Option<TipoMedia> {
        match valor.trim().to_lowercase().as_str() {
            "galeria" => Some(TipoMedia::Galeria),
            "backstage" => Some(TipoMedia::Backstage),
            _ => None,
        }
    }
}

/// Un espacio de imagen. `archivo_local` es la referencia pendiente: tras un
/// ciclo de guardado exitoso nunca convive con una subida sin reconciliar.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MediaSlot {
    pub id: i64,
    pub contenido_id: i64,
    pub tipo: String,
    pub indice: i32,
    pub url_remota: Option<String>,
    pub archivo_local: Option<String>,
}

// ==================== ESPACIOS DE REFERENCIA ====================

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EspacioReferencia {
    pub id: i64,
    pub contenido_id: i64,
    pub texto_descriptivo: Option<String>,
    pub texto_mostrar: String,
    pub url: String,
    pub orden: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EspacioReferenciaInput {
    pub texto_descriptivo: Option<String>,
    pub texto_mostrar: Option<String>,
    pub url: Option<String>,
    pub orden: Option<i32>,
}

/// Entrada ya saneada, lista para insertar.
#[derive(Debug, Clone, PartialEq)]
pub struct EspacioNuevo {
    pub texto_descriptivo: Option<String>,
    pub texto_mostrar: String,
    pub url: String,
    pub orden: i32,
}

/// Normaliza la lista recibida: las entradas sin texto a mostrar o sin URL se
/// descartan en silencio; el orden ausente se completa con la posición.
pub fn normalizar_espacios(entradas: Vec<EspacioReferenciaInput>) -> Vec<EspacioNuevo> {
    entradas
        .into_iter()
        .enumerate()
        .filter_map(|(idx, e)| {
            let texto_mostrar = e.texto_mostrar.filter(|t| !t.trim().is_empty())?;
            let url = e.url.filter(|u| !u.trim().is_empty())?;
            Some(EspacioNuevo {
                texto_descriptivo: e.texto_descriptivo.filter(|t| !t.trim().is_empty()),
                texto_mostrar,
                url,
                orden: e.orden.unwrap_or(idx as i32 + 1),
            })
        })
        .collect()
}

// ==================== PAYLOADS ====================

#[derive(Debug, Deserialize)]
pub struct CrearContenidoPayload {
    pub categoria: String,
    pub titulo: String,
    pub fecha_publicacion: NaiveDate,
    pub estado: Option<String>,
    #[serde(flatten)]
    pub campos: CamposCategoria,
    pub espacios_referencia: Option<Vec<EspacioReferenciaInput>>,
}

#[derive(Debug, Deserialize)]
pub struct ActualizarContenidoPayload {
    pub categoria: Option<String>,
    pub titulo: Option<String>,
    pub fecha_publicacion: Option<NaiveDate>,
    pub estado: Option<String>,
    pub autor_id: Option<i64>,
    #[serde(flatten)]
    pub campos: CamposCategoria,
    pub espacios_referencia: Option<Vec<EspacioReferenciaInput>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campos_issues() -> CamposCategoria {
        CamposCategoria {
            nombre_modelo: Some("Carola".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn issues_requiere_nombre_modelo() {
        let err = DatosCategoria::validar(Categoria::Issues, CamposCategoria::default());
        assert!(matches!(err, Err(ContenidoError::Validacion(_))));

        // Espacios en blanco cuentan como faltante
        let campos = CamposCategoria {
            nombre_modelo: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(DatosCategoria::validar(Categoria::Issues, campos).is_err());

        let datos = DatosCategoria::validar(Categoria::Issues, campos_issues()).unwrap();
        assert_eq!(datos.categoria(), Categoria::Issues);
    }

    #[test]
    fn madeinarg_requiere_subcategoria_valida() {
        assert!(DatosCategoria::validar(Categoria::Madeinarg, CamposCategoria::default()).is_err());

        let campos = CamposCategoria {
            subcategoria_madeinarg: Some("muebles".to_string()),
            ..Default::default()
        };
        assert!(DatosCategoria::validar(Categoria::Madeinarg, campos).is_err());

        let campos = CamposCategoria {
            subcategoria_madeinarg: Some("Calzado".to_string()),
            tags_marcas: Some("Vans, , Topper ,".to_string()),
            ..Default::default()
        };
        let datos = DatosCategoria::validar(Categoria::Madeinarg, campos).unwrap();
        match datos {
            DatosCategoria::Madeinarg {
                subcategoria_madeinarg,
                tags_marcas,
                ..
            } => {
                assert_eq!(subcategoria_madeinarg, SubcategoriaMadeinarg::Calzado);
                assert_eq!(tags_marcas, vec!["Vans".to_string(), "Topper".to_string()]);
            }
            _ => panic!("variante inesperada"),
        }
    }

    #[test]
    fn news_requiere_cuerpo() {
        assert!(DatosCategoria::validar(Categoria::News, CamposCategoria::default()).is_err());

        let campos = CamposCategoria {
            contenido_news: Some("Texto de la noticia".to_string()),
            ..Default::default()
        };
        assert!(DatosCategoria::validar(Categoria::News, campos).is_ok());
    }

    #[test]
    fn editorials_y_club_pompa_sin_requisitos_extra() {
        assert!(DatosCategoria::validar(Categoria::Editorials, CamposCategoria::default()).is_ok());
        assert!(DatosCategoria::validar(Categoria::ClubPompa, CamposCategoria::default()).is_ok());
    }

    #[test]
    fn estado_parse_normaliza_mayusculas() {
        assert_eq!(
            EstadoPublicacion::parse("Publicado"),
            Some(EstadoPublicacion::Publicado)
        );
        assert_eq!(
            EstadoPublicacion::parse("PUBLICADO"),
            Some(EstadoPublicacion::Publicado)
        );
        assert_eq!(
            EstadoPublicacion::parse("en_papelera"),
            Some(EstadoPublicacion::EnPapelera)
        );
        assert_eq!(EstadoPublicacion::parse("archivado"), None);
    }

    #[test]
    fn espacios_descarta_entradas_incompletas_y_asigna_orden() {
        let entradas = vec![
            EspacioReferenciaInput {
                texto_descriptivo: Some("Photographer".to_string()),
                texto_mostrar: Some("FFLORENC".to_string()),
                url: Some("https://instagram.com/fflorenc".to_string()),
                orden: None,
            },
            // Sin URL: se descarta sin error
            EspacioReferenciaInput {
                texto_descriptivo: None,
                texto_mostrar: Some("Stylist".to_string()),
                url: None,
                orden: None,
            },
            EspacioReferenciaInput {
                texto_descriptivo: None,
                texto_mostrar: Some("Makeup".to_string()),
                url: Some("https://example.com".to_string()),
                orden: Some(7),
            },
        ];
        let normalizados = normalizar_espacios(entradas);
        assert_eq!(normalizados.len(), 2);
        assert_eq!(normalizados[0].orden, 1);
        assert_eq!(normalizados[1].orden, 7);
    }

    #[test]
    fn campos_ida_y_vuelta() {
        let datos = DatosCategoria::validar(Categoria::Issues, campos_issues()).unwrap();
        let campos = datos.a_campos();
        assert_eq!(campos.nombre_modelo.as_deref(), Some("Carola"));
        assert!(campos.contenido_news.is_none());
        let de_vuelta = DatosCategoria::desde_fila(Categoria::Issues, campos);
        match de_vuelta {
            DatosCategoria::Issues { nombre_modelo, .. } => assert_eq!(nombre_modelo, "Carola"),
            _ => panic!("variante inesperada"),
        }
    }

    #[test]
    fn mezclar_conserva_lo_existente() {
        let base = CamposCategoria {
            nombre_modelo: Some("Carola".to_string()),
            subtitulo_issue: Some("Primavera".to_string()),
            ..Default::default()
        };
        let parche = CamposCategoria {
            nombre_modelo: Some("Violeta".to_string()),
            ..Default::default()
        };
        let mezclado = base.mezclar(parche);
        assert_eq!(mezclado.nombre_modelo.as_deref(), Some("Violeta"));
        assert_eq!(mezclado.subtitulo_issue.as_deref(), Some("Primavera"));
    }
}
