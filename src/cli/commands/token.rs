use serde_json::json;

use crate::auth::{generate_jwt, Claims, Role};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::repository::users;

/// The user must exist; the server re-checks role and bans on every request anyway
pub async fn handle(user_id: i32, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = super::connect().await?;
    let access = users::find_access(&pool, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User {} not found", user_id))?;
    if access.baneado {
        anyhow::bail!("User {} is banned", user_id);
    }

    let role = Role::try_from(access.id_rol)?;
    let claims = Claims::new(access.id_usuario, role, access.correo.clone());
    let token = generate_jwt(&claims)?;

    match output_format {
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
        OutputFormat::Json => output_success(
            &output_format,
            &format!("Token for {} ({})", access.correo, role),
            Some(json!({
                "token": token,
                "expires_in": claims.expires_in(),
                "id_usuario": access.id_usuario,
                "rol": role.name(),
            })),
        ),
    }
}
