//! User roles and the static role → permission table

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::classifier::Operation;

/// User role levels as stored on the user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Role {
    /// Regular user: read-only access
    Reader = 0,
    /// Read, create and update access
    Editor = 1,
    /// Read, create, update and delete access
    Admin = 2,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }
}

impl TryFrom<i32> for Role {
    type Error = i32;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Role::Reader),
            1 => Ok(Role::Editor),
            2 => Ok(Role::Admin),
            other => Err(other),
        }
    }
}

impl From<Role> for i32 {
    fn from(r: Role) -> Self {
        r as i32
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Allowed operations per raw role value. The sets are listed literally,
/// not derived from one another.
static ROLE_TABLE: Lazy<HashMap<i32, &'static [Operation]>> = Lazy::new(|| {
    HashMap::from([
        (0, &[Operation::Read][..]),
        (1, &[Operation::Read, Operation::Create, Operation::Update][..]),
        (
            2,
            &[
                Operation::Read,
                Operation::Create,
                Operation::Update,
                Operation::Delete,
            ][..],
        ),
    ])
});

/// Look up the permission set of a raw role value; `None` for unknown roles
pub fn permissions_for(role: i32) -> Option<&'static [Operation]> {
    ROLE_TABLE.get(&role).copied()
}

/// Whether `role` grants `operation`. Unknown roles grant nothing.
pub fn is_permitted(role: i32, operation: Operation) -> bool {
    permissions_for(role)
        .map(|ops| ops.contains(&operation))
        .unwrap_or(false)
}
