use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ban {
    pub id_baneo: i32,
    pub id_usuario: i32,
    pub usuario: String,
    pub correo: String,
    pub id_moderador: Option<i32>,
    pub moderador: Option<String>,
    pub motivo: String,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin: Option<DateTime<Utc>>,
    pub activo: bool,
}
