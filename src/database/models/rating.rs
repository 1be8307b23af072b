use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Rating {
    pub id_valoracion: i32,
    pub id_evento: i32,
    pub id_usuario: i32,
    pub autor: String,
    pub puntuacion: i16,
    pub comentario: Option<String>,
    pub fecha: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingSummary {
    pub promedio: Option<f64>,
    pub total: i64,
    pub valoraciones: Vec<Rating>,
}

impl RatingSummary {
    pub fn from_ratings(valoraciones: Vec<Rating>) -> Self {
        let total = valoraciones.len() as i64;
        let promedio = if total == 0 {
            None
        } else {
            let sum: i64 = valoraciones.iter().map(|r| r.puntuacion as i64).sum();
            Some(((sum as f64 / total as f64) * 100.0).round() / 100.0)
        };
        Self {
            promedio,
            total,
            valoraciones,
        }
    }
}
