//! User entity.

use super::value_objects::{Education, UserRole, UserStatus};
use crate::clock::same_calendar_day;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// A registered event attendee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Externally assigned identifier.
    pub id: String,

    /// Generated short code, unique across all users.
    pub uid: String,

    pub name: String,

    pub email: String,

    /// Contact number; unique across users and used for role assignment.
    pub phone: String,

    pub university: String,

    pub size_jersey: String,

    /// Dietary or medical note.
    pub food_limitation: Option<String>,

    pub invitation_code: Option<String>,

    pub status: UserStatus,

    pub graduated_year: Option<String>,

    pub faculty: Option<String>,

    /// Public URL of the uploaded profile image.
    pub image_url: String,

    /// Last successful check-in; `None` means never checked in.
    pub last_entered: Option<DateTime<Utc>>,

    pub role: UserRole,

    pub education: Education,

    /// Registration timestamp.
    pub registered_at: DateTime<Utc>,
}

impl User {
    /// Checks whether the user already checked in on the calendar day of
    /// `now`, evaluated in the given offset.
    #[must_use]
    pub fn has_entered_on_day_of(&self, now: DateTime<Utc>, offset: FixedOffset) -> bool {
        self.last_entered
            .is_some_and(|entered| same_calendar_day(entered, now, offset))
    }

    /// Replaces the user's role.
    pub fn change_role(&mut self, role: UserRole) {
        self.role = role;
    }

    /// Checks if the user holds the staff role.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Staff)
    }
}
