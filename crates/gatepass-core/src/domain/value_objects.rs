//! Enumerated attributes of an attendee.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Attendee roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular attendee.
    #[default]
    Member,
    /// Event staff; may scan QR codes.
    Staff,
    /// Organizer with full access.
    Admin,
}

impl UserRole {
    /// Returns the wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    /// Returns all available roles.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Member, Self::Staff, Self::Admin]
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Attendee affiliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    ChulaStudent,
    Alumni,
    GeneralPublic,
    GeneralStudent,
}

impl UserStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ChulaStudent => "chula_student",
            Self::Alumni => "alumni",
            Self::GeneralPublic => "general_public",
            Self::GeneralStudent => "general_student",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chula_student" => Ok(Self::ChulaStudent),
            "alumni" => Ok(Self::Alumni),
            "general_public" => Ok(Self::GeneralPublic),
            "general_student" => Ok(Self::GeneralStudent),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// Education stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Education {
    Studying,
    Graduated,
}

impl Education {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Studying => "studying",
            Self::Graduated => "graduated",
        }
    }
}

impl fmt::Display for Education {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Education {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "studying" => Ok(Self::Studying),
            "graduated" => Ok(Self::Graduated),
            other => Err(format!("unknown education: {other}")),
        }
    }
}
