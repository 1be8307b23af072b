use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Moderation state of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pendiente,
    Aprobado,
    Rechazado,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Pendiente => "pendiente",
            EventStatus::Aprobado => "aprobado",
            EventStatus::Rechazado => "rechazado",
        }
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pendiente" => Ok(EventStatus::Pendiente),
            "aprobado" => Ok(EventStatus::Aprobado),
            "rechazado" => Ok(EventStatus::Rechazado),
            other => Err(format!("Estado desconocido: {}", other)),
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Card shown in listings
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EventSummary {
    pub id_evento: i32,
    pub titulo: String,
    pub categoria: String,
    pub ciudad: String,
    pub lugar: String,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin: Option<DateTime<Utc>>,
    pub es_gratis: bool,
    pub estado: String,
    pub aforo: Option<i32>,
    pub imagen_principal: Option<String>,
    pub precio_minimo: Option<Decimal>,
    pub promedio_valoracion: Option<f64>,
    pub total_reservas: i64,
}

/// Minimal row for ownership, state and capacity checks
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id_evento: i32,
    pub id_usuario: i32,
    pub titulo: String,
    pub lugar: String,
    pub fecha_inicio: DateTime<Utc>,
    pub aforo: Option<i32>,
    pub estado: String,
}

impl EventRow {
    pub fn status(&self) -> Option<EventStatus> {
        self.estado.parse().ok()
    }

    pub fn is_approved(&self) -> bool {
        self.status() == Some(EventStatus::Aprobado)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventImage {
    pub id_imagen: i32,
    pub url: String,
    #[serde(skip_serializing)]
    pub clave: String,
    pub nombre_archivo: String,
    pub tipo_mime: String,
    pub tamano: i64,
    pub es_principal: bool,
}

/// Documents are served through the API, so their storage location stays private
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDocument {
    pub id_documento: i32,
    #[serde(skip_serializing)]
    pub url: String,
    #[serde(skip_serializing)]
    pub clave: String,
    pub nombre_archivo: String,
    pub tipo_mime: String,
    pub tamano: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id_boleta: i32,
    pub nombre: String,
    pub precio: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLink {
    pub id_link: i32,
    pub url: String,
    pub descripcion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportantInfo {
    pub id_informacion: i32,
    pub texto: String,
}

/// Full event page, child collections come back as JSON aggregates
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EventDetail {
    pub id_evento: i32,
    pub id_usuario: i32,
    pub organizador: String,
    pub titulo: String,
    pub descripcion: String,
    pub categoria: String,
    pub ciudad: String,
    pub lugar: String,
    pub direccion: String,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin: Option<DateTime<Utc>>,
    pub aforo: Option<i32>,
    pub pulep: Option<String>,
    pub responsable: Option<String>,
    pub es_gratis: bool,
    pub estado: String,
    pub motivo_estado: Option<String>,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_actualizacion: DateTime<Utc>,
    pub imagenes: Json<Vec<EventImage>>,
    pub documentos: Json<Vec<EventDocument>>,
    pub boletas: Json<Vec<Ticket>>,
    pub links: Json<Vec<EventLink>>,
    pub informacion_importante: Json<Vec<ImportantInfo>>,
    pub total_reservas: i64,
    pub promedio_valoracion: Option<f64>,
    pub total_valoraciones: i64,
}

impl EventDetail {
    pub fn status(&self) -> Option<EventStatus> {
        self.estado.parse().ok()
    }
}

/// Stored file row fetched for download
#[derive(Debug, Clone, FromRow)]
pub struct StoredFile {
    pub clave: String,
    pub nombre_archivo: String,
    pub tipo_mime: String,
}

/// Validated event fields ready to be written
#[derive(Debug, Clone)]
pub struct EventFields {
    pub titulo: String,
    pub descripcion: String,
    pub categoria: String,
    pub ciudad: String,
    pub lugar: String,
    pub direccion: String,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin: Option<DateTime<Utc>>,
    pub aforo: Option<i32>,
    pub pulep: Option<String>,
    pub responsable: Option<String>,
    pub es_gratis: bool,
    pub boletas: Vec<TicketInput>,
    pub links: Vec<LinkInput>,
    pub informacion_importante: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TicketInput {
    pub nombre: String,
    pub precio: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkInput {
    pub url: String,
    #[serde(default)]
    pub descripcion: Option<String>,
}

/// Listing filters for the public catalog
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub q: Option<String>,
    pub categoria: Option<String>,
    pub ciudad: Option<String>,
    pub desde: Option<DateTime<Utc>>,
    pub hasta: Option<DateTime<Utc>>,
    pub incluir_pasados: bool,
    pub solo_gratis: bool,
}
