use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Public view of an account, never carries the password hash
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserProfile {
    pub id_usuario: i32,
    pub nombre: String,
    pub apellido: String,
    pub correo: String,
    pub telefono: Option<String>,
    pub id_rol: i16,
    pub rol: String,
    pub fecha_registro: DateTime<Utc>,
}

/// Row used by login; `contrasena` is the bcrypt hash
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id_usuario: i32,
    pub correo: String,
    pub contrasena: String,
    pub id_rol: i16,
    pub baneado: bool,
}

/// What the auth middleware needs to know about the caller on every request
#[derive(Debug, Clone, FromRow)]
pub struct UserAccess {
    pub id_usuario: i32,
    pub nombre: String,
    pub apellido: String,
    pub correo: String,
    pub id_rol: i16,
    pub baneado: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserListItem {
    pub id_usuario: i32,
    pub nombre: String,
    pub apellido: String,
    pub correo: String,
    pub telefono: Option<String>,
    pub id_rol: i16,
    pub rol: String,
    pub fecha_registro: DateTime<Utc>,
    pub baneado: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub nombre: String,
    pub apellido: String,
    pub correo: String,
    pub password_hash: String,
    pub telefono: Option<String>,
    pub id_rol: i16,
}
