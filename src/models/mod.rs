pub mod attachments;
pub mod tags;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

pub use attachments::{AttachmentView, project_attachments};
pub use tags::{TagInput, decode_tags, encode_tags};

/// Account role. Stored as lowercase text in `users.role`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "teacher")]
    Teacher,
    #[sea_orm(string_value = "student")]
    Student,
}

/// Operations gated by role rather than by ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    CreateCase,
    ModerateCases,
    ManageUsers,
    ManageTaxonomy,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::Admin => &[
                Capability::CreateCase,
                Capability::ModerateCases,
                Capability::ManageUsers,
                Capability::ManageTaxonomy,
            ],
            Role::Teacher => &[Capability::CreateCase],
            Role::Student => &[],
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }

    /// Authors may modify their own cases; moderators may modify any case.
    pub fn can_modify_case(&self, author_id: i32) -> bool {
        self.user_id == author_id || self.can(Capability::ModerateCases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(user_id: i32, role: Role) -> Principal {
        Principal {
            user_id,
            username: format!("user{}", user_id),
            role,
        }
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Admin.can(Capability::ManageUsers));
        assert!(Role::Admin.can(Capability::CreateCase));
        assert!(Role::Teacher.can(Capability::CreateCase));
        assert!(!Role::Teacher.can(Capability::ManageTaxonomy));
        assert!(!Role::Student.can(Capability::CreateCase));
    }

    #[test]
    fn test_role_parse_roundtrip() {
        for role in [Role::Admin, Role::Teacher, Role::Student] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_case_modification_rights() {
        assert!(principal(1, Role::Teacher).can_modify_case(1));
        assert!(!principal(2, Role::Teacher).can_modify_case(1));
        assert!(principal(3, Role::Admin).can_modify_case(1));
        assert!(!principal(4, Role::Student).can_modify_case(1));
    }
}
