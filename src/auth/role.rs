use serde::{Deserialize, Serialize};

use super::AuthError;

/// Platform roles as stored in `tabla_roles`, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum Role {
    Usuario = 1,
    Promotor = 2,
    Moderador = 3,
    Administrador = 4,
}

impl Role {
    pub fn id(self) -> i16 {
        self as i16
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Usuario => "Usuario",
            Role::Promotor => "Promotor",
            Role::Moderador => "Moderador",
            Role::Administrador => "Administrador",
        }
    }

    pub fn can_create_events(self) -> bool {
        self >= Role::Promotor
    }

    pub fn can_moderate(self) -> bool {
        self >= Role::Moderador
    }

    pub fn is_admin(self) -> bool {
        self == Role::Administrador
    }

    /// Moderators may only sanction users below them; admins may sanction moderators.
    pub fn can_ban(self, target: Role) -> bool {
        self.can_moderate() && target < self
    }
}

impl TryFrom<i16> for Role {
    type Error = AuthError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Role::Usuario),
            2 => Ok(Role::Promotor),
            3 => Ok(Role::Moderador),
            4 => Ok(Role::Administrador),
            other => Err(AuthError::InvalidRole(other)),
        }
    }
}

impl From<Role> for i16 {
    fn from(role: Role) -> Self {
        role.id()
    }
}

/// Accepts the role name in any case or its numeric id
impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if let Ok(id) = value.parse::<i16>() {
            return Role::try_from(id).map_err(|e| e.to_string());
        }
        [Role::Usuario, Role::Promotor, Role::Moderador, Role::Administrador]
            .into_iter()
            .find(|role| role.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown role '{}'", value))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_known_ids() {
        assert_eq!(Role::try_from(1).unwrap(), Role::Usuario);
        assert_eq!(Role::try_from(4).unwrap(), Role::Administrador);
        assert!(matches!(Role::try_from(0), Err(AuthError::InvalidRole(0))));
        assert!(matches!(Role::try_from(5), Err(AuthError::InvalidRole(5))));
    }

    #[test]
    fn parses_names_and_ids() {
        assert_eq!("moderador".parse::<Role>().unwrap(), Role::Moderador);
        assert_eq!(" Administrador ".parse::<Role>().unwrap(), Role::Administrador);
        assert_eq!("2".parse::<Role>().unwrap(), Role::Promotor);
        assert!("root".parse::<Role>().is_err());
        assert!("9".parse::<Role>().is_err());
    }

    #[test]
    fn privileges_follow_rank() {
        assert!(!Role::Usuario.can_create_events());
        assert!(Role::Promotor.can_create_events());
        assert!(!Role::Promotor.can_moderate());
        assert!(Role::Moderador.can_moderate());
        assert!(!Role::Moderador.is_admin());
        assert!(Role::Administrador.is_admin());
    }

    #[test]
    fn ban_hierarchy() {
        assert!(Role::Moderador.can_ban(Role::Usuario));
        assert!(Role::Moderador.can_ban(Role::Promotor));
        assert!(!Role::Moderador.can_ban(Role::Moderador));
        assert!(!Role::Moderador.can_ban(Role::Administrador));
        assert!(Role::Administrador.can_ban(Role::Moderador));
        assert!(!Role::Administrador.can_ban(Role::Administrador));
        assert!(!Role::Promotor.can_ban(Role::Usuario));
    }

    #[test]
    fn serializes_as_numeric_id() {
        assert_eq!(serde_json::to_value(Role::Moderador).unwrap(), serde_json::json!(3));
        let role: Role = serde_json::from_value(serde_json::json!(2)).unwrap();
        assert_eq!(role, Role::Promotor);
        assert!(serde_json::from_value::<Role>(serde_json::json!(9)).is_err());
    }
}
