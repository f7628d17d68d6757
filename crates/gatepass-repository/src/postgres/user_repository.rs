//! PostgreSQL user repository implementation.

use crate::{traits::UserRepository, DatabasePoolInterface};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatepass_core::{GatepassError, GatepassResult, User};
use sqlx::FromRow;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Arc<dyn DatabasePoolInterface>,
}

impl PgUserRepository {
    /// Creates a new PostgreSQL user repository.
    #[must_use]
    pub fn new(pool: Arc<dyn DatabasePoolInterface>) -> Self {
        Self { pool }
    }
}

/// Database row representation of a user.
#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    uid: String,
    name: String,
    email: String,
    phone: String,
    university: String,
    size_jersey: String,
    food_limitation: Option<String>,
    invitation_code: Option<String>,
    status: String,
    graduated_year: Option<String>,
    faculty: Option<String>,
    image_url: String,
    last_entered: Option<DateTime<Utc>>,
    role: String,
    education: String,
    registered_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = GatepassError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            status: parse_column(&row.status)?,
            role: parse_column(&row.role)?,
            education: parse_column(&row.education)?,
            id: row.id,
            uid: row.uid,
            name: row.name,
            email: row.email,
            phone: row.phone,
            university: row.university,
            size_jersey: row.size_jersey,
            food_limitation: row.food_limitation,
            invitation_code: row.invitation_code,
            graduated_year: row.graduated_year,
            faculty: row.faculty,
            image_url: row.image_url,
            last_entered: row.last_entered,
            registered_at: row.registered_at,
        })
    }
}

fn parse_column<T: FromStr<Err = String>>(value: &str) -> GatepassResult<T> {
    value
        .parse()
        .map_err(|e| GatepassError::Internal(format!("Invalid value in database: {e}")))
}

/// Builds an `ILIKE` pattern matching `fragment` literally anywhere.
fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn rows_to_users(rows: Vec<UserRow>) -> GatepassResult<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: &str) -> GatepassResult<Option<User>> {
        debug!("Finding user by id: {}", id);

        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, uid, name, email, phone, university, size_jersey,
                   food_limitation, invitation_code, status, graduated_year, faculty,
                   image_url, last_entered, role, education, registered_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_phone(&self, phone: &str) -> GatepassResult<Option<User>> {
        debug!("Finding user by phone: {}", phone);

        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, uid, name, email, phone, university, size_jersey,
                   food_limitation, invitation_code, status, graduated_year, faculty,
                   image_url, last_entered, role, education, registered_at
            FROM users
            WHERE phone = $1
            ",
        )
        .bind(phone)
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_all(&self) -> GatepassResult<Vec<User>> {
        debug!("Finding all users");

        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, uid, name, email, phone, university, size_jersey,
                   food_limitation, invitation_code, status, graduated_year, faculty,
                   image_url, last_entered, role, education, registered_at
            FROM users
            ORDER BY registered_at, id
            ",
        )
        .fetch_all(self.pool.inner())
        .await?;

        rows_to_users(rows)
    }

    async fn search_by_name(&self, fragment: &str) -> GatepassResult<Vec<User>> {
        debug!("Searching users by name: {}", fragment);

        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, uid, name, email, phone, university, size_jersey,
                   food_limitation, invitation_code, status, graduated_year, faculty,
                   image_url, last_entered, role, education, registered_at
            FROM users
            WHERE name ILIKE $1
            ORDER BY registered_at, id
            ",
        )
        .bind(contains_pattern(fragment))
        .fetch_all(self.pool.inner())
        .await?;

        rows_to_users(rows)
    }

    async fn exists_by_uid(&self, uid: &str) -> GatepassResult<bool> {
        let result: Option<i32> = sqlx::query_scalar("SELECT 1 FROM users WHERE uid = $1 LIMIT 1")
            .bind(uid)
            .fetch_optional(self.pool.inner())
            .await?;

        Ok(result.is_some())
    }

    async fn save(&self, user: &User) -> GatepassResult<User> {
        debug!("Saving user: {}", user.id);

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (
                id, uid, name, email, phone, university, size_jersey,
                food_limitation, invitation_code, status, graduated_year, faculty,
                image_url, last_entered, role, education, registered_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING id, uid, name, email, phone, university, size_jersey,
                      food_limitation, invitation_code, status, graduated_year, faculty,
                      image_url, last_entered, role, education, registered_at
            ",
        )
        .bind(&user.id)
        .bind(&user.uid)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.university)
        .bind(&user.size_jersey)
        .bind(&user.food_limitation)
        .bind(&user.invitation_code)
        .bind(user.status.as_str())
        .bind(&user.graduated_year)
        .bind(&user.faculty)
        .bind(&user.image_url)
        .bind(user.last_entered)
        .bind(user.role.as_str())
        .bind(user.education.as_str())
        .bind(user.registered_at)
        .fetch_one(self.pool.inner())
        .await?;

        User::try_from(row)
    }

    async fn update(&self, user: &User) -> GatepassResult<User> {
        debug!("Updating user: {}", user.id);

        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users
            SET name = $2, email = $3, phone = $4, university = $5, size_jersey = $6,
                food_limitation = $7, invitation_code = $8, status = $9,
                graduated_year = $10, faculty = $11, image_url = $12,
                role = $13, education = $14
            WHERE id = $1
            RETURNING id, uid, name, email, phone, university, size_jersey,
                      food_limitation, invitation_code, status, graduated_year, faculty,
                      image_url, last_entered, role, education, registered_at
            ",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.university)
        .bind(&user.size_jersey)
        .bind(&user.food_limitation)
        .bind(&user.invitation_code)
        .bind(user.status.as_str())
        .bind(&user.graduated_year)
        .bind(&user.faculty)
        .bind(&user.image_url)
        .bind(user.role.as_str())
        .bind(user.education.as_str())
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(User::try_from)
            .transpose()?
            .ok_or_else(|| GatepassError::not_found("User", &user.id))
    }

    async fn record_entry(
        &self,
        id: &str,
        at: DateTime<Utc>,
        not_before: DateTime<Utc>,
    ) -> GatepassResult<Option<User>> {
        debug!("Recording entry for user: {}", id);

        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users
            SET last_entered = $2
            WHERE id = $1 AND (last_entered IS NULL OR last_entered < $3)
            RETURNING id, uid, name, email, phone, university, size_jersey,
                      food_limitation, invitation_code, status, graduated_year, faculty,
                      image_url, last_entered, role, education, registered_at
            ",
        )
        .bind(id)
        .bind(at)
        .bind(not_before)
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn delete(&self, id: &str) -> GatepassResult<bool> {
        debug!("Deleting user: {}", id);

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("som"), "%som%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_row_conversion_rejects_unknown_role() {
        let row = UserRow {
            id: "u1".to_string(),
            uid: "ABC234".to_string(),
            name: "Nok".to_string(),
            email: "nok@example.com".to_string(),
            phone: "0812345678".to_string(),
            university: "Chula".to_string(),
            size_jersey: "M".to_string(),
            food_limitation: None,
            invitation_code: None,
            status: "alumni".to_string(),
            graduated_year: None,
            faculty: None,
            image_url: String::new(),
            last_entered: None,
            role: "superuser".to_string(),
            education: "graduated".to_string(),
            registered_at: Utc::now(),
        };

        let err = User::try_from(row).unwrap_err();
        assert!(matches!(err, GatepassError::Internal(_)));
    }
}
