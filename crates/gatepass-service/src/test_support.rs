//! In-memory doubles for the service tests.

use crate::cache::CacheInterface;
use crate::dto::RegisterRequest;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use gatepass_core::{
    Clock, Education, GatepassError, GatepassResult, User, UserRole, UserStatus,
};
use gatepass_repository::UserRepository;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn test_user(id: &str, phone: &str) -> User {
    User {
        id: id.to_string(),
        uid: format!("UID{id}").to_uppercase(),
        name: format!("Attendee {id}"),
        email: format!("{id}@example.com"),
        phone: phone.to_string(),
        university: "Chulalongkorn".to_string(),
        size_jersey: "M".to_string(),
        food_limitation: None,
        invitation_code: None,
        status: UserStatus::Alumni,
        graduated_year: Some("2020".to_string()),
        faculty: Some("Engineering".to_string()),
        image_url: String::new(),
        last_entered: None,
        role: UserRole::Member,
        education: Education::Graduated,
        registered_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    }
}

pub fn register_request(id: &str, phone: &str) -> RegisterRequest {
    RegisterRequest {
        id: id.to_string(),
        name: format!("Attendee {id}"),
        email: format!("{id}@example.com"),
        phone: phone.to_string(),
        university: "Chulalongkorn".to_string(),
        size_jersey: "L".to_string(),
        food_limitation: None,
        invitation_code: None,
        status: UserStatus::ChulaStudent,
        graduated_year: None,
        faculty: Some("Science".to_string()),
        education: Education::Studying,
    }
}

/// User repository over a map, enforcing the same uniqueness and
/// conditional-update rules as the PostgreSQL store.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, User>>,
    find_by_id_calls: AtomicUsize,
    exists_calls: AtomicUsize,
    save_calls: AtomicUsize,
    update_calls: AtomicUsize,
    record_entry_calls: AtomicUsize,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn get(&self, id: &str) -> Option<User> {
        self.users.lock().unwrap().get(id).cloned()
    }

    pub fn all(&self) -> Vec<User> {
        self.users.lock().unwrap().values().cloned().collect()
    }

    pub fn set_last_entered(&self, id: &str, at: DateTime<Utc>) {
        if let Some(user) = self.users.lock().unwrap().get_mut(id) {
            user.last_entered = Some(at);
        }
    }

    pub fn find_by_id_calls(&self) -> usize {
        self.find_by_id_calls.load(Ordering::SeqCst)
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn record_entry_calls(&self) -> usize {
        self.record_entry_calls.load(Ordering::SeqCst)
    }

    fn sorted(mut users: Vec<User>) -> Vec<User> {
        users.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        users
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &str) -> GatepassResult<Option<User>> {
        self.find_by_id_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.get(id))
    }

    async fn find_by_phone(&self, phone: &str) -> GatepassResult<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.phone == phone).cloned())
    }

    async fn find_all(&self) -> GatepassResult<Vec<User>> {
        Ok(Self::sorted(self.all()))
    }

    async fn search_by_name(&self, fragment: &str) -> GatepassResult<Vec<User>> {
        let needle = fragment.to_lowercase();
        let matches = self
            .all()
            .into_iter()
            .filter(|u| u.name.to_lowercase().contains(&needle))
            .collect();
        Ok(Self::sorted(matches))
    }

    async fn exists_by_uid(&self, uid: &str) -> GatepassResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        let users = self.users.lock().unwrap();
        Ok(users.values().any(|u| u.uid == uid))
    }

    async fn save(&self, user: &User) -> GatepassResult<User> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|u| u.id == user.id || u.phone == user.phone || u.uid == user.uid)
        {
            return Err(GatepassError::conflict("duplicate key value"));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> GatepassResult<User> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        let Some(last_entered) = users.get(&user.id).map(|u| u.last_entered) else {
            return Err(GatepassError::not_found("User", &user.id));
        };
        if users
            .values()
            .any(|u| u.id != user.id && u.phone == user.phone)
        {
            return Err(GatepassError::conflict("duplicate key value"));
        }
        let stored = User {
            last_entered,
            ..user.clone()
        };
        users.insert(user.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn record_entry(
        &self,
        id: &str,
        at: DateTime<Utc>,
        not_before: DateTime<Utc>,
    ) -> GatepassResult<Option<User>> {
        self.record_entry_calls.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        match users.get_mut(id) {
            Some(user) if user.last_entered.map_or(true, |prev| prev < not_before) => {
                user.last_entered = Some(at);
                Ok(Some(user.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> GatepassResult<bool> {
        Ok(self.users.lock().unwrap().remove(id).is_some())
    }
}

/// Cache over a map that records every call. `fail_all` makes each
/// operation return a cache error; `fail_deletes` only breaks invalidation.
#[derive(Default)]
pub struct RecordingCache {
    entries: Mutex<HashMap<String, String>>,
    deleted: Mutex<Vec<String>>,
    set_calls: AtomicUsize,
    failing: AtomicBool,
    failing_deletes: AtomicBool,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.failing_deletes.store(true, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn deleted(&self, key: &str) -> bool {
        self.deleted.lock().unwrap().iter().any(|k| k == key)
    }

    pub fn delete_calls(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> GatepassResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatepassError::Cache("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheInterface for RecordingCache {
    async fn get_raw(&self, key: &str) -> GatepassResult<Option<String>> {
        self.check()?;
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: &str, _ttl: Duration) -> GatepassResult<()> {
        self.check()?;
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> GatepassResult<bool> {
        self.check()?;
        if self.failing_deletes.load(Ordering::SeqCst) {
            return Err(GatepassError::Cache("connection reset".to_string()));
        }
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Clock that only moves when told to.
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
