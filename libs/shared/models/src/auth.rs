use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Actor role carried in the session token. Anything we cannot parse maps to
/// `Unknown`, which every mutating operation rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Role {
    Patient,
    Doctor,
    Nurse,
    Admin,
    Unknown,
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::from_claim(Some(&value))
    }
}

impl Role {
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim {
            Some("patient") => Role::Patient,
            Some("doctor") => Role::Doctor,
            Some("nurse") => Role::Nurse,
            Some("admin") => Role::Admin,
            _ => Role::Unknown,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Role::Unknown)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
            Role::Nurse => write!(f, "nurse"),
            Role::Admin => write!(f, "admin"),
            Role::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
}
