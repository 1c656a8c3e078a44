//! Attendee accounts.

use std::fmt;
use std::str::FromStr;

/// Account role. Admins see the dashboard; both roles earn and spend points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
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
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

/// An attendee as stored.
///
/// `total_points` is a cached projection of the ledger; it is only ever
/// written by the ledger's append path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub employee_id: String,
    pub name: String,
    pub total_points: i64,
    pub missions_completed: i64,
    pub role: Role,
    pub created_at: String,
}

impl User {
    /// A fresh account with no points and no completed missions.
    pub fn new(employee_id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            employee_id: employee_id.into(),
            name: name.into(),
            total_points: 0,
            missions_completed: 0,
            role,
            created_at: crate::storage::now(),
        }
    }
}
