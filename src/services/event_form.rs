//! Multipart event form: collection and validation.
//!
//! Text fields arrive as plain form values, `boletas` and `links` as JSON
//! arrays, `informacion_importante` may repeat, and files come in under
//! `imagenes` and `documentos`. Validation reports every field problem at once.

use axum::body::Bytes;
use axum::extract::Multipart;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::config::UploadConfig;
use crate::database::models::{EventFields, LinkInput, TicketInput};
use crate::error::ApiError;
use crate::time::parse_datetime;
use crate::validation::{non_blank, validate_http_url, FieldErrors};

pub const MAX_TICKETS: usize = 20;
pub const MAX_LINKS: usize = 10;
pub const MAX_NOTICES: usize = 20;
pub const MAX_CAPACITY: i32 = 1_000_000;

fn max_ticket_price() -> Decimal {
    Decimal::from(100_000_000)
}

/// A file part exactly as received
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update,
}

#[derive(Debug, Default)]
pub struct EventForm {
    fields: HashMap<String, String>,
    informacion_importante: Vec<String>,
    imagenes: Vec<UploadedFile>,
    documentos: Vec<UploadedFile>,
    imagenes_conservar: Option<Vec<String>>,
    documentos_conservar: Option<Vec<String>>,
}

/// Output of [`EventForm::validate`]; file content types are the sniffed ones
#[derive(Debug)]
pub struct ValidatedEvent {
    pub fields: EventFields,
    pub imagenes: Vec<UploadedFile>,
    pub documentos: Vec<UploadedFile>,
    /// `None` keeps every existing image
    pub imagenes_conservar: Option<Vec<i32>>,
    pub documentos_conservar: Option<Vec<i32>>,
}

impl EventForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = EventForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "imagenes" | "documentos" => {
                    let file_name = field.file_name().unwrap_or("archivo").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part for an untouched file input
                    if bytes.is_empty() {
                        continue;
                    }
                    form.push_file(
                        &name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes,
                        },
                    );
                }
                _ => {
                    let value = field.text().await?;
                    form.push_text(&name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn push_text(&mut self, name: &str, value: String) {
        match name {
            "informacion_importante" => self.informacion_importante.push(value),
            "imagenes_conservar" => self.imagenes_conservar.get_or_insert_with(Vec::new).push(value),
            "documentos_conservar" => self.documentos_conservar.get_or_insert_with(Vec::new).push(value),
            "" => {}
            _ => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }

    pub fn push_file(&mut self, name: &str, file: UploadedFile) {
        match name {
            "imagenes" => self.imagenes.push(file),
            "documentos" => self.documentos.push(file),
            _ => {}
        }
    }

    fn text(&self, name: &str) -> Option<String> {
        non_blank(self.fields.get(name).map(String::as_str))
    }

    pub fn validate(self, now: DateTime<Utc>, mode: FormMode, limits: &UploadConfig) -> Result<ValidatedEvent, ApiError> {
        let mut errors = FieldErrors::new();

        let titulo = self.text("titulo").unwrap_or_default();
        errors.check_length("titulo", &titulo, 5, 150);
        let descripcion = self.text("descripcion").unwrap_or_default();
        errors.check_length("descripcion", &descripcion, 20, 5000);

        let mut place = |field: &str| {
            let value = self.text(field).unwrap_or_default();
            errors.check_length(field, &value, 2, 120);
            value
        };
        let categoria = place("categoria");
        let ciudad = place("ciudad");
        let lugar = place("lugar");
        let direccion = place("direccion");

        let fecha_inicio = match self.text("fecha_inicio") {
            None => {
                errors.add("fecha_inicio", "La fecha de inicio es obligatoria");
                None
            }
            Some(raw) => match parse_datetime(&raw) {
                None => {
                    errors.add("fecha_inicio", "Fecha inválida");
                    None
                }
                Some(start) => {
                    if mode == FormMode::Create && start <= now {
                        errors.add("fecha_inicio", "La fecha de inicio debe ser futura");
                    }
                    Some(start)
                }
            },
        };

        let fecha_fin = match self.text("fecha_fin") {
            None => None,
            Some(raw) => match parse_datetime(&raw) {
                None => {
                    errors.add("fecha_fin", "Fecha inválida");
                    None
                }
                Some(end) => {
                    if fecha_inicio.is_some_and(|start| end < start) {
                        errors.add("fecha_fin", "La fecha de fin no puede ser anterior al inicio");
                    }
                    Some(end)
                }
            },
        };

        let aforo = match self.text("aforo") {
            None => None,
            Some(raw) => match raw.parse::<i32>() {
                Ok(value) => {
                    errors.check_range("aforo", value, 1, MAX_CAPACITY);
                    Some(value)
                }
                Err(_) => {
                    errors.add("aforo", "Debe ser un número entero");
                    None
                }
            },
        };

        let pulep = self.text("pulep");
        if let Some(pulep) = &pulep {
            errors.check_length("pulep", pulep, 1, 50);
        }
        let responsable = self.text("responsable");
        if let Some(responsable) = &responsable {
            errors.check_length("responsable", responsable, 1, 120);
        }

        let es_gratis = self.text("es_gratis").map(|v| parse_flag(&v)).unwrap_or(false);

        let boletas = match self.text("boletas") {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<TicketInput>>(&raw) {
                Ok(tickets) => tickets,
                Err(_) => {
                    errors.add("boletas", "Formato de boletería inválido");
                    Vec::new()
                }
            },
        };
        let boletas = normalize_tickets(boletas, es_gratis, &mut errors);

        let links = match self.text("links") {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<LinkInput>>(&raw) {
                Ok(links) => links,
                Err(_) => {
                    errors.add("links", "Formato de links inválido");
                    Vec::new()
                }
            },
        };
        let links = normalize_links(links, &mut errors);

        let informacion_importante: Vec<String> = self
            .informacion_importante
            .iter()
            .filter_map(|text| non_blank(Some(text)))
            .collect();
        if informacion_importante.len() > MAX_NOTICES {
            errors.add(
                "informacion_importante",
                format!("Máximo {} avisos importantes", MAX_NOTICES),
            );
        }
        if informacion_importante.iter().any(|text| text.chars().count() > 500) {
            errors.add("informacion_importante", "Cada aviso debe tener máximo 500 caracteres");
        }

        let imagenes = check_images(self.imagenes, mode, limits, &mut errors);
        let documentos = check_documents(self.documentos, mode, limits, &mut errors);

        let imagenes_conservar = parse_ids("imagenes_conservar", self.imagenes_conservar, &mut errors);
        let documentos_conservar = parse_ids("documentos_conservar", self.documentos_conservar, &mut errors);

        errors.into_result()?;

        let fecha_inicio = fecha_inicio.ok_or_else(|| ApiError::field_error("fecha_inicio", "Fecha inválida"))?;

        Ok(ValidatedEvent {
            fields: EventFields {
                titulo,
                descripcion,
                categoria,
                ciudad,
                lugar,
                direccion,
                fecha_inicio,
                fecha_fin,
                aforo,
                pulep,
                responsable,
                es_gratis,
                boletas,
                links,
                informacion_importante,
            },
            imagenes,
            documentos,
            imagenes_conservar,
            documentos_conservar,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "si" | "sí" | "yes"
    )
}

fn normalize_tickets(tickets: Vec<TicketInput>, es_gratis: bool, errors: &mut FieldErrors) -> Vec<TicketInput> {
    if tickets.len() > MAX_TICKETS {
        errors.add("boletas", format!("Máximo {} tipos de boleta", MAX_TICKETS));
    }

    let mut out = Vec::with_capacity(tickets.len());
    for ticket in tickets {
        let nombre = ticket.nombre.trim().to_string();
        let len = nombre.chars().count();
        if len == 0 || len > 60 {
            errors.add("boletas", "Cada boleta necesita un nombre de máximo 60 caracteres");
        }
        if ticket.precio < Decimal::ZERO || ticket.precio > max_ticket_price() {
            errors.add("boletas", "El precio debe estar entre 0 y 100.000.000");
        }
        if es_gratis && ticket.precio > Decimal::ZERO {
            errors.add("boletas", "Un evento gratuito no puede tener boletas con precio");
        }
        out.push(TicketInput {
            nombre,
            precio: ticket.precio.round_dp(2),
        });
    }
    out
}

fn normalize_links(links: Vec<LinkInput>, errors: &mut FieldErrors) -> Vec<LinkInput> {
    if links.len() > MAX_LINKS {
        errors.add("links", format!("Máximo {} links", MAX_LINKS));
    }

    let mut out = Vec::with_capacity(links.len());
    for link in links {
        let url = link.url.trim().to_string();
        errors.check("links", validate_http_url(&url));
        let descripcion = non_blank(link.descripcion.as_deref());
        if descripcion.as_ref().is_some_and(|d| d.chars().count() > 120) {
            errors.add("links", "La descripción de cada link debe tener máximo 120 caracteres");
        }
        out.push(LinkInput { url, descripcion });
    }
    out
}

fn check_images(
    files: Vec<UploadedFile>,
    mode: FormMode,
    limits: &UploadConfig,
    errors: &mut FieldErrors,
) -> Vec<UploadedFile> {
    if mode == FormMode::Create && files.len() > limits.max_images_per_event {
        errors.add(
            "imagenes",
            format!("Máximo {} imágenes por evento", limits.max_images_per_event),
        );
    }

    let mut out = Vec::with_capacity(files.len());
    for mut file in files {
        if file.bytes.len() > limits.max_image_bytes {
            errors.add(
                "imagenes",
                format!("Cada imagen debe pesar máximo {}", human_size(limits.max_image_bytes)),
            );
            continue;
        }
        match sniff_image(&file.bytes) {
            Some(detected) => {
                file.content_type = detected.to_string();
                out.push(file);
            }
            None => errors.add("imagenes", "Solo se permiten imágenes JPG, PNG o WEBP"),
        }
    }
    out
}

fn check_documents(
    files: Vec<UploadedFile>,
    mode: FormMode,
    limits: &UploadConfig,
    errors: &mut FieldErrors,
) -> Vec<UploadedFile> {
    if mode == FormMode::Create && files.len() > limits.max_documents_per_event {
        errors.add(
            "documentos",
            format!("Máximo {} documentos por evento", limits.max_documents_per_event),
        );
    }

    let mut out = Vec::with_capacity(files.len());
    for mut file in files {
        if file.bytes.len() > limits.max_document_bytes {
            errors.add(
                "documentos",
                format!("Cada documento debe pesar máximo {}", human_size(limits.max_document_bytes)),
            );
            continue;
        }
        if !file.bytes.starts_with(b"%PDF-") {
            errors.add("documentos", "Solo se permiten documentos PDF");
            continue;
        }
        file.content_type = "application/pdf".to_string();
        out.push(file);
    }
    out
}

/// Accepts repeated fields, comma lists or a JSON array
fn parse_ids(field: &str, raw: Option<Vec<String>>, errors: &mut FieldErrors) -> Option<Vec<i32>> {
    let raw = raw?;
    let mut ids = Vec::new();
    for value in raw {
        let value = value.trim();
        if value.starts_with('[') {
            match serde_json::from_str::<Vec<i32>>(value) {
                Ok(parsed) => ids.extend(parsed),
                Err(_) => errors.add(field, "Lista de identificadores inválida"),
            }
            continue;
        }
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.parse::<i32>() {
                Ok(id) => ids.push(id),
                Err(_) => errors.add(field, "Lista de identificadores inválida"),
            }
        }
    }
    ids.sort_unstable();
    ids.dedup();
    Some(ids)
}

/// MIME type from the file signature, ignoring what the client claimed
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

fn human_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MB", bytes / (1024 * 1024))
    } else {
        format!("{} KB", bytes / 1024)
    }
}
