use clap::Subcommand;
use serde_json::json;

use crate::auth::Role;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::repository::users;
use crate::services::account_service::RegisterRequest;
use crate::services::AccountService;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user with any role")]
    Create {
        #[arg(long, help = "Email address")]
        correo: String,
        #[arg(long, help = "First name")]
        nombre: String,
        #[arg(long, help = "Last name")]
        apellido: String,
        #[arg(long, help = "Password (at least 8 characters)")]
        contrasena: String,
        #[arg(long, help = "Phone number")]
        telefono: Option<String>,
        #[arg(long, default_value = "usuario", help = "Role name or id")]
        rol: Role,
    },

    #[command(about = "Change the role of an existing user")]
    Role {
        #[arg(help = "User id")]
        id: i32,
        #[arg(help = "Role name or id")]
        rol: Role,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Create {
            correo,
            nombre,
            apellido,
            contrasena,
            telefono,
            rol,
        } => {
            let request = RegisterRequest {
                nombre,
                apellido,
                correo,
                contrasena,
                telefono,
            };
            request.validate().map_err(describe)?;

            let pool = super::connect().await?;
            let profile = AccountService::from_pool(pool)
                .create_user(request, rol)
                .await
                .map_err(describe)?;

            output_success(
                &output_format,
                &format!("User {} created as {}", profile.correo, rol),
                Some(json!({ "usuario": profile })),
            )
        }
        UserCommands::Role { id, rol } => {
            let pool = super::connect().await?;
            let profile = users::set_role(&pool, id, rol)
                .await?
                .ok_or_else(|| anyhow::anyhow!("User {} not found", id))?;

            output_success(
                &output_format,
                &format!("User {} is now {}", profile.correo, rol),
                Some(json!({ "usuario": profile })),
            )
        }
    }
}

/// Flatten an API error, including field errors, into one line
fn describe(err: crate::error::ApiError) -> anyhow::Error {
    let body = err.to_json();
    match body["field_errors"].as_object() {
        Some(fields) => {
            let details: Vec<String> = fields
                .iter()
                .map(|(field, message)| format!("{}: {}", field, message.as_str().unwrap_or_default()))
                .collect();
            anyhow::anyhow!("{} ({})", err.message(), details.join(", "))
        }
        None => anyhow::anyhow!("{}", err.message()),
    }
}
