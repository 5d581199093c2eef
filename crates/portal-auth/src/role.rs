//! Partner roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Authorization role held by a partner account.
///
/// `None` marks an account that has not picked a role yet. It can be read
/// back from the role store but never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Doctor,
    DiagnosticCenter,
    Physiotherapist,
    EcgLab,
    None,
}

impl Role {
    /// Roles a user may pick on the role-selection screen.
    pub const ASSIGNABLE: [Role; 4] = [
        Role::Doctor,
        Role::DiagnosticCenter,
        Role::Physiotherapist,
        Role::EcgLab,
    ];

    /// Wire name, as stored in `user_roles.role`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::DiagnosticCenter => "diagnostic_center",
            Role::Physiotherapist => "physiotherapist",
            Role::EcgLab => "ecg_lab",
            Role::None => "none",
        }
    }

    /// Returns true for every role except `None`.
    pub fn is_assigned(&self) -> bool {
        !matches!(self, Role::None)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Doctor => "Doctor",
            Role::DiagnosticCenter => "Diagnostic Center",
            Role::Physiotherapist => "Physiotherapist",
            Role::EcgLab => "ECG Lab",
            Role::None => "No role",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    /// Accepts the wire name in snake_case or kebab-case, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "doctor" => Ok(Role::Doctor),
            "diagnostic_center" => Ok(Role::DiagnosticCenter),
            "physiotherapist" => Ok(Role::Physiotherapist),
            "ecg_lab" => Ok(Role::EcgLab),
            "none" => Ok(Role::None),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}
