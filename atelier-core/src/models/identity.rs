use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "identity_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Assistant,
    Client,
}

impl Role {
    /// Owners and assistants run the studio; everything they do is a staff action.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Owner | Role::Assistant)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Assistant => write!(f, "assistant"),
            Role::Client => write!(f, "client"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "assistant" => Ok(Role::Assistant),
            "client" => Ok(Role::Client),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// A caller or participant as resolved by the external identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn owner() -> Self {
        Self::new(Uuid::new_v4(), Role::Owner)
    }

    pub fn assistant() -> Self {
        Self::new(Uuid::new_v4(), Role::Assistant)
    }

    pub fn client() -> Self {
        Self::new(Uuid::new_v4(), Role::Client)
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display_and_parse() {
        for role in [Role::Owner, Role::Assistant, Role::Client] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert_eq!("CLIENT".parse::<Role>().unwrap(), Role::Client);
        assert!("manager".parse::<Role>().is_err());
    }

    #[test]
    fn test_staff_roles() {
        assert!(Identity::owner().is_staff());
        assert!(Identity::assistant().is_staff());
        assert!(!Identity::client().is_staff());
    }
}
