use sqlx::{PgConnection, PgPool};

use crate::auth::Role;
use crate::database::manager::{conflict_on_unique, DatabaseError};
use crate::database::models::{NewUser, UserAccess, UserCredentials, UserListItem, UserProfile};

/// `TRUE` while the user has a ban that is active and not yet expired
pub const ACTIVE_BAN: &str = "EXISTS (
    SELECT 1 FROM tabla_baneados b
    WHERE b.id_usuario = u.id_usuario
      AND b.activo
      AND (b.fecha_fin IS NULL OR b.fecha_fin > NOW())
)";

const PROFILE_COLUMNS: &str = "u.id_usuario, u.nombre, u.apellido, u.correo, u.telefono, u.id_rol,
    r.nombre AS rol, u.fecha_registro";

pub async fn insert_user(pool: &PgPool, user: &NewUser) -> Result<UserProfile, DatabaseError> {
    let sql = format!(
        "WITH u AS (
            INSERT INTO tabla_usuarios (nombre, apellido, correo, contrasena, telefono, id_rol)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        )
        SELECT {} FROM u JOIN tabla_roles r ON r.id_rol = u.id_rol",
        PROFILE_COLUMNS
    );

    sqlx::query_as::<_, UserProfile>(&sql)
        .bind(&user.nombre)
        .bind(&user.apellido)
        .bind(&user.correo)
        .bind(&user.password_hash)
        .bind(&user.telefono)
        .bind(user.id_rol)
        .fetch_one(pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Ya existe una cuenta con ese correo"))
}

/// Case-insensitive lookup by e-mail
pub async fn find_credentials(pool: &PgPool, correo: &str) -> Result<Option<UserCredentials>, DatabaseError> {
    let sql = format!(
        "SELECT u.id_usuario, u.correo, u.contrasena, u.id_rol, {} AS baneado
         FROM tabla_usuarios u
         WHERE LOWER(u.correo) = LOWER($1)",
        ACTIVE_BAN
    );

    let row = sqlx::query_as::<_, UserCredentials>(&sql)
        .bind(correo.trim())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_access(pool: &PgPool, id_usuario: i32) -> Result<Option<UserAccess>, DatabaseError> {
    let sql = format!(
        "SELECT u.id_usuario, u.nombre, u.apellido, u.correo, u.id_rol, {} AS baneado
         FROM tabla_usuarios u
         WHERE u.id_usuario = $1",
        ACTIVE_BAN
    );

    let row = sqlx::query_as::<_, UserAccess>(&sql)
        .bind(id_usuario)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Same as [`find_access`] but locks the user row until the transaction ends.
/// The ban state is read by a second statement so it sees bans committed while
/// this one waited for the lock.
pub async fn lock_access(conn: &mut PgConnection, id_usuario: i32) -> Result<Option<UserAccess>, DatabaseError> {
    let locked: Option<i32> = sqlx::query_scalar("SELECT id_usuario FROM tabla_usuarios WHERE id_usuario = $1 FOR UPDATE")
        .bind(id_usuario)
        .fetch_optional(&mut *conn)
        .await?;
    if locked.is_none() {
        return Ok(None);
    }

    let sql = format!(
        "SELECT u.id_usuario, u.nombre, u.apellido, u.correo, u.id_rol, {} AS baneado
         FROM tabla_usuarios u
         WHERE u.id_usuario = $1",
        ACTIVE_BAN
    );
    let row = sqlx::query_as::<_, UserAccess>(&sql)
        .bind(id_usuario)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_profile(pool: &PgPool, id_usuario: i32) -> Result<Option<UserProfile>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM tabla_usuarios u JOIN tabla_roles r ON r.id_rol = u.id_rol WHERE u.id_usuario = $1",
        PROFILE_COLUMNS
    );

    let row = sqlx::query_as::<_, UserProfile>(&sql)
        .bind(id_usuario)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Search by name or e-mail, optionally restricted to one role
pub async fn list_users(
    pool: &PgPool,
    q: Option<&str>,
    role: Option<Role>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<UserListItem>, i64), DatabaseError> {
    let pattern = q.map(|q| format!("%{}%", escape_like(q)));
    let role_id = role.map(Role::id);

    let filter = "($1::TEXT IS NULL
            OR u.nombre ILIKE $1 OR u.apellido ILIKE $1 OR u.correo ILIKE $1
            OR CONCAT(u.nombre, ' ', u.apellido) ILIKE $1)
        AND ($2::SMALLINT IS NULL OR u.id_rol = $2)";

    let sql = format!(
        "SELECT {}, {} AS baneado
         FROM tabla_usuarios u JOIN tabla_roles r ON r.id_rol = u.id_rol
         WHERE {}
         ORDER BY u.fecha_registro DESC, u.id_usuario DESC
         LIMIT $3 OFFSET $4",
        PROFILE_COLUMNS, ACTIVE_BAN, filter
    );
    let users = sqlx::query_as::<_, UserListItem>(&sql)
        .bind(&pattern)
        .bind(role_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM tabla_usuarios u WHERE {}", filter);
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(&pattern)
        .bind(role_id)
        .fetch_one(pool)
        .await?;

    Ok((users, total))
}

pub async fn set_role(pool: &PgPool, id_usuario: i32, role: Role) -> Result<Option<UserProfile>, DatabaseError> {
    let sql = format!(
        "WITH u AS (
            UPDATE tabla_usuarios SET id_rol = $2 WHERE id_usuario = $1 RETURNING *
        )
        SELECT {} FROM u JOIN tabla_roles r ON r.id_rol = u.id_rol",
        PROFILE_COLUMNS
    );

    let row = sqlx::query_as::<_, UserProfile>(&sql)
        .bind(id_usuario)
        .bind(role.id())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_are_escaped() {
        assert_eq!(escape_like(" 100%_real\\ "), "100\\%\\_real\\\\");
        assert_eq!(escape_like("rock"), "rock");
    }
}
