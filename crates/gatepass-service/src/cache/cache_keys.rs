//! Cache key generators for consistent key naming.

/// Prefix for all cache keys to namespace them.
const CACHE_PREFIX: &str = "gatepass:cache";

/// Generate a cache key for a user by ID.
#[must_use]
pub fn user_by_id(id: &str) -> String {
    format!("{CACHE_PREFIX}:user:id:{id}")
}

/// Generate a cache key for a user by phone.
#[must_use]
pub fn user_by_phone(phone: &str) -> String {
    format!("{CACHE_PREFIX}:user:phone:{phone}")
}

/// Key of the full user list.
#[must_use]
pub fn all_users() -> String {
    format!("{CACHE_PREFIX}:users:all")
}

/// Generate a cache key for a name-filtered user list.
///
/// Filtered lists are never invalidated explicitly; they expire with the TTL.
#[must_use]
pub fn users_by_name(filter: &str) -> String {
    format!("{CACHE_PREFIX}:users:name:{}", filter.to_lowercase())
}

/// Keys to drop after a user record changes.
#[must_use]
pub fn user_invalidation_keys(id: &str, phones: &[&str]) -> Vec<String> {
    let mut keys = vec![user_by_id(id), all_users()];
    keys.extend(phones.iter().map(|phone| user_by_phone(phone)));
    keys
}
