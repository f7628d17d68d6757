//! User service implementation.

use crate::cache::{cache_keys, CacheExt, CacheInterface};
use crate::dto::{
    ImageUpload, QrResponse, RegisterRequest, SignInRequest, TokenResponse, UpdateRoleRequest,
    UpdateUserRequest,
};
use crate::role_policy::RolePolicy;
use crate::uid_allocator::UidAllocator;
use crate::user_service::UserService;
use async_trait::async_trait;
use chrono::FixedOffset;
use gatepass_config::{AppConfig, RolePolicyConfig};
use gatepass_core::{
    start_of_day, Clock, GatepassError, GatepassResult, ObjectStorage, StoredObject,
    TokenIssuer, User, UserRole, ValidateExt,
};
use gatepass_repository::UserRepository;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Settings the user service reads from configuration.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Bucket profile images are uploaded to.
    pub bucket: String,
    /// Prefix of every image object key.
    pub key_prefix: String,
    pub cache_ttl: Duration,
    /// Offset in which check-in calendar days are evaluated.
    pub utc_offset: FixedOffset,
    /// QR image URL with an `{id}` placeholder.
    pub qr_url_template: String,
    pub roles: RolePolicyConfig,
    pub uid_length: usize,
    pub uid_max_attempts: u32,
}

impl ServiceSettings {
    /// Extracts the service settings from the application configuration.
    pub fn from_config(config: &AppConfig) -> GatepassResult<Self> {
        let utc_offset = config.checkin.offset().ok_or_else(|| {
            GatepassError::Configuration(format!(
                "Invalid check-in UTC offset: {} minutes",
                config.checkin.utc_offset_minutes
            ))
        })?;

        Ok(Self {
            bucket: config.storage.bucket.clone(),
            key_prefix: config.storage.key_prefix.clone(),
            cache_ttl: config.redis.ttl(),
            utc_offset,
            qr_url_template: config.checkin.qr_url_template.clone(),
            roles: config.roles.clone(),
            uid_length: config.registration.uid_length,
            uid_max_attempts: config.registration.uid_max_attempts,
        })
    }

    fn image_key(&self, uid: &str, file_name: &str) -> String {
        format!("{}/{}_{}", self.key_prefix.trim_end_matches('/'), uid, file_name)
    }

    fn qr_url(&self, id: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
        self.qr_url_template.replace("{id}", &encoded)
    }
}

/// User service backed by the repository, cache, storage and token issuer.
pub struct UserServiceImpl {
    user_repository: Arc<dyn UserRepository>,
    cache: Arc<dyn CacheInterface>,
    storage: Arc<dyn ObjectStorage>,
    token_issuer: Arc<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
    role_policy: RolePolicy,
    uid_allocator: UidAllocator,
    settings: ServiceSettings,
}

impl UserServiceImpl {
    /// Creates a new user service.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        cache: Arc<dyn CacheInterface>,
        storage: Arc<dyn ObjectStorage>,
        token_issuer: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        let role_policy = RolePolicy::new(&settings.roles);
        let uid_allocator = UidAllocator::new(
            user_repository.clone(),
            settings.uid_length,
            settings.uid_max_attempts,
        );

        Self {
            user_repository,
            cache,
            storage,
            token_issuer,
            clock,
            role_policy,
            uid_allocator,
            settings,
        }
    }

    async fn find_cached_by_id(&self, id: &str) -> GatepassResult<User> {
        let repo = &self.user_repository;
        self.cache
            .read_through(&cache_keys::user_by_id(id), self.settings.cache_ttl, || {
                repo.find_by_id(id)
            })
            .await?
            .ok_or_else(|| GatepassError::not_found("User", id))
    }

    async fn find_stored_by_id(&self, id: &str) -> GatepassResult<User> {
        self.user_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| GatepassError::not_found("User", id))
    }

    /// Drops the per-user, per-phone and all-users entries.
    async fn invalidate_user(&self, id: &str, phones: &[&str]) {
        let keys = cache_keys::user_invalidation_keys(id, phones);
        self.cache.invalidate(&keys).await;
    }

    async fn issue_token(&self, user: &User) -> GatepassResult<TokenResponse> {
        let access_token = self
            .token_issuer
            .issue(&user.id, user.role)
            .await
            .map_err(|e| {
                warn!("Token issuance failed for user {}: {}", user.id, e);
                match e {
                    GatepassError::TokenIssuance(_) => e,
                    other => GatepassError::token_issuance(other.to_string()),
                }
            })?;

        Ok(TokenResponse {
            user_id: user.id.clone(),
            access_token,
        })
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn register(
        &self,
        request: RegisterRequest,
        image: ImageUpload,
    ) -> GatepassResult<TokenResponse> {
        debug!("Registering user: {}", request.id);

        request.validate_request()?;
        image.validate()?;

        let role = self.role_policy.assign_role(&request.phone);
        let uid = self.uid_allocator.allocate().await?;

        let key = self.settings.image_key(&uid, image.sanitized_file_name());
        let ImageUpload {
            content_type,
            bytes,
            ..
        } = image;

        let image_url = self
            .storage
            .upload(&self.settings.bucket, &key, bytes, &content_type)
            .await
            .map_err(|e| {
                warn!("Image upload failed for user {}: {}", request.id, e);
                match e {
                    GatepassError::UploadFailed(_) => e,
                    other => GatepassError::upload_failed(other.to_string()),
                }
            })?;

        let user = request.into_user(uid, role, image_url, self.clock.now());
        let saved = self.user_repository.save(&user).await?;

        self.cache
            .put(&cache_keys::user_by_id(&saved.id), &saved, self.settings.cache_ttl)
            .await;
        self.cache
            .invalidate(&[
                cache_keys::all_users(),
                cache_keys::user_by_phone(&saved.phone),
            ])
            .await;

        info!(
            "User registered: {} (uid: {}, role: {})",
            saved.id, saved.uid, saved.role
        );

        self.issue_token(&saved).await
    }

    async fn sign_in(&self, request: SignInRequest) -> GatepassResult<TokenResponse> {
        debug!("Signing in user: {}", request.id);

        request.validate_request()?;
        let user = self.find_cached_by_id(&request.id).await?;

        self.issue_token(&user).await
    }

    async fn get_all(&self) -> GatepassResult<Vec<User>> {
        debug!("Getting all users");

        let repo = &self.user_repository;
        let users = self
            .cache
            .read_through(&cache_keys::all_users(), self.settings.cache_ttl, || async move {
                repo.find_all().await.map(Some)
            })
            .await?;

        Ok(users.unwrap_or_default())
    }

    async fn get_by_name(&self, name: &str) -> GatepassResult<Vec<User>> {
        debug!("Getting users by name: {}", name);

        let repo = &self.user_repository;
        let users = self
            .cache
            .read_through(&cache_keys::users_by_name(name), self.settings.cache_ttl, || async move {
                repo.search_by_name(name).await.map(Some)
            })
            .await?;

        Ok(users.unwrap_or_default())
    }

    async fn get_by_id(&self, id: &str) -> GatepassResult<User> {
        debug!("Getting user: {}", id);
        self.find_cached_by_id(id).await
    }

    async fn get_by_phone(&self, phone: &str) -> GatepassResult<User> {
        debug!("Getting user by phone: {}", phone);

        let repo = &self.user_repository;
        self.cache
            .read_through(&cache_keys::user_by_phone(phone), self.settings.cache_ttl, || {
                repo.find_by_phone(phone)
            })
            .await?
            .ok_or_else(|| GatepassError::not_found("User", phone))
    }

    async fn get_qr_url(&self, id: &str) -> GatepassResult<QrResponse> {
        let user = self.find_cached_by_id(id).await?;

        Ok(QrResponse {
            qr_url: self.settings.qr_url(&user.id),
            user_id: user.id,
        })
    }

    async fn scan_qr(&self, id: &str) -> GatepassResult<User> {
        debug!("Scanning QR for user: {}", id);

        let user = self.find_cached_by_id(id).await?;
        let now = self.clock.now();
        let offset = self.settings.utc_offset;

        if user.has_entered_on_day_of(now, offset) {
            warn!("User {} has already entered today", id);
            return Err(GatepassError::AlreadyEntered(Box::new(user)));
        }

        let recorded = self
            .user_repository
            .record_entry(id, now, start_of_day(now, offset))
            .await?;

        match recorded {
            Some(updated) => {
                self.invalidate_user(&updated.id, &[updated.phone.as_str()]).await;
                info!("User {} checked in at {}", id, now);
                Ok(updated)
            }
            None => {
                // Another scan won the conditional update, or the cached copy was stale.
                let current = self.find_stored_by_id(id).await?;
                self.invalidate_user(&current.id, &[current.phone.as_str()]).await;
                warn!("User {} has already entered today", id);
                Err(GatepassError::AlreadyEntered(Box::new(current)))
            }
        }
    }

    async fn update_profile(&self, id: &str, request: UpdateUserRequest) -> GatepassResult<User> {
        debug!("Updating user: {}", id);

        request.validate_request()?;

        let mut user = self.find_stored_by_id(id).await?;
        let old_phone = user.phone.clone();
        request.apply_to(&mut user);

        let updated = self.user_repository.update(&user).await?;
        self.invalidate_user(&updated.id, &[old_phone.as_str(), updated.phone.as_str()])
            .await;

        info!("User updated: {}", id);
        Ok(updated)
    }

    async fn update_role(&self, id: &str, request: UpdateRoleRequest) -> GatepassResult<User> {
        debug!("Updating user role: {} -> {}", id, request.role);

        let mut user = self.find_stored_by_id(id).await?;
        user.change_role(request.role);

        let updated = self.user_repository.update(&user).await?;
        self.invalidate_user(&updated.id, &[updated.phone.as_str()]).await;

        info!("User role updated: {} -> {}", id, updated.role);
        Ok(updated)
    }

    async fn add_staff(&self, phone: &str) -> GatepassResult<User> {
        debug!("Adding staff: {}", phone);

        let found = self.get_by_phone(phone).await?;
        let mut user = self.find_stored_by_id(&found.id).await?;
        if user.is_staff() {
            warn!("User {} is already staff", user.id);
            return Err(GatepassError::AlreadyStaff(Box::new(user)));
        }

        user.change_role(UserRole::Staff);
        let updated = self.user_repository.update(&user).await?;
        self.invalidate_user(&updated.id, &[phone, updated.phone.as_str()]).await;

        info!("User {} promoted to staff", updated.id);
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> GatepassResult<()> {
        debug!("Deleting user: {}", id);

        let user = self.find_stored_by_id(id).await?;
        if !self.user_repository.delete(id).await? {
            return Err(GatepassError::not_found("User", id));
        }

        self.invalidate_user(id, &[user.phone.as_str()]).await;

        info!("User deleted: {}", id);
        Ok(())
    }

    async fn get_image(&self, key: &str) -> GatepassResult<StoredObject> {
        debug!("Fetching image: {}", key);

        if key.trim().is_empty() {
            return Err(GatepassError::validation("key: Image key is required"));
        }

        self.storage.download(&self.settings.bucket, key).await
    }
}

impl std::fmt::Debug for UserServiceImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserServiceImpl")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        register_request, test_user, InMemoryUserRepository, RecordingCache, TestClock,
    };
    use chrono::{TimeZone, Utc};
    use gatepass_core::{MockObjectStorage, MockTokenIssuer};
    use std::collections::HashSet;

    fn settings() -> ServiceSettings {
        ServiceSettings {
            bucket: "gatepass-images".to_string(),
            key_prefix: "cutu-2025".to_string(),
            cache_ttl: Duration::from_secs(3600),
            utc_offset: FixedOffset::east_opt(7 * 3600).unwrap(),
            qr_url_template: "https://qr.example.com/?data={id}".to_string(),
            roles: RolePolicyConfig {
                staff_phones: vec!["08".to_string()],
                admin_phones: vec!["09".to_string()],
            },
            uid_length: 6,
            uid_max_attempts: 10,
        }
    }

    fn storage_ok() -> MockObjectStorage {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_upload()
            .returning(|_, key, _, _| Ok(format!("http://localhost:4000/api/users/image/{key}")));
        storage
    }

    fn issuer_ok() -> MockTokenIssuer {
        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_issue()
            .returning(|user_id, _| Ok(format!("token-{user_id}")));
        issuer
    }

    struct Fixture {
        repo: Arc<InMemoryUserRepository>,
        cache: Arc<RecordingCache>,
        clock: Arc<TestClock>,
        service: UserServiceImpl,
    }

    fn fixture_with(storage: MockObjectStorage, issuer: MockTokenIssuer) -> Fixture {
        let repo = Arc::new(InMemoryUserRepository::new());
        let cache = Arc::new(RecordingCache::new());
        // 2025-03-01 09:00 +07:00
        let clock = Arc::new(TestClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 2, 0, 0).unwrap()));
        let service = UserServiceImpl::new(
            repo.clone(),
            cache.clone(),
            Arc::new(storage),
            Arc::new(issuer),
            clock.clone(),
            settings(),
        );
        Fixture {
            repo,
            cache,
            clock,
            service,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(storage_ok(), issuer_ok())
    }

    fn image() -> ImageUpload {
        ImageUpload::new("me.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47])
    }

    #[tokio::test]
    async fn test_register_success() {
        let f = fixture();

        let token = f
            .service
            .register(register_request("u2", "0700000000"), image())
            .await
            .unwrap();

        assert_eq!(token.user_id, "u2");
        assert_eq!(token.access_token, "token-u2");

        let stored = f.repo.get("u2").unwrap();
        assert_eq!(stored.role, UserRole::Member);
        assert_eq!(stored.uid.len(), 6);
        assert_eq!(stored.registered_at, f.clock.now());
        assert_eq!(
            stored.image_url,
            format!("http://localhost:4000/api/users/image/cutu-2025/{}_me.png", stored.uid)
        );
        assert!(f.cache.contains(&cache_keys::user_by_id("u2")));
        assert!(f.cache.deleted(&cache_keys::all_users()));
        assert!(f.cache.deleted(&cache_keys::user_by_phone("0700000000")));
    }

    #[tokio::test]
    async fn test_register_staff_and_admin_phones() {
        let f = fixture();

        f.service
            .register(register_request("u1", "08"), image())
            .await
            .unwrap();
        f.service
            .register(register_request("u3", "09"), image())
            .await
            .unwrap();

        assert_eq!(f.repo.get("u1").unwrap().role, UserRole::Staff);
        assert_eq!(f.repo.get("u3").unwrap().role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_register_upload_key_uses_prefix_and_uid() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_upload()
            .withf(|bucket, key, body, content_type| {
                bucket == "gatepass-images"
                    && key.starts_with("cutu-2025/")
                    && key.ends_with("_me.png")
                    && body.len() == 4
                    && content_type == "image/png"
            })
            .times(1)
            .returning(|_, _, _, _| Ok("http://img".to_string()));
        let f = fixture_with(storage, issuer_ok());

        f.service
            .register(register_request("u1", "0811111111"), image())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_upload_failure_persists_nothing() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_upload()
            .returning(|_, _, _, _| Err(GatepassError::upload_failed("bucket unavailable")));
        let mut issuer = MockTokenIssuer::new();
        issuer.expect_issue().never();
        let f = fixture_with(storage, issuer);

        let err = f
            .service
            .register(register_request("u1", "0811111111"), image())
            .await
            .unwrap_err();

        assert!(matches!(err, GatepassError::UploadFailed(_)));
        assert_eq!(f.repo.save_calls(), 0);
        assert!(f.repo.get("u1").is_none());
    }

    #[tokio::test]
    async fn test_register_storage_error_surfaces_as_upload_failed() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_upload()
            .returning(|_, _, _, _| Err(GatepassError::external("s3", "timeout")));
        let f = fixture_with(storage, issuer_ok());

        let err = f
            .service
            .register(register_request("u1", "0811111111"), image())
            .await
            .unwrap_err();

        assert!(matches!(err, GatepassError::UploadFailed(_)));
    }

    #[tokio::test]
    async fn test_register_token_failure_keeps_user() {
        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_issue()
            .returning(|_, _| Err(GatepassError::internal("signing key unavailable")));
        let f = fixture_with(storage_ok(), issuer);

        let err = f
            .service
            .register(register_request("u1", "0811111111"), image())
            .await
            .unwrap_err();

        assert!(matches!(err, GatepassError::TokenIssuance(_)));
        assert!(f.repo.get("u1").is_some());
    }

    #[tokio::test]
    async fn test_register_duplicate_phone_is_conflict() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));

        let err = f
            .service
            .register(register_request("u2", "0811111111"), image())
            .await
            .unwrap_err();

        assert!(matches!(err, GatepassError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_profile_before_upload() {
        let mut storage = MockObjectStorage::new();
        storage.expect_upload().never();
        let f = fixture_with(storage, issuer_ok());

        let mut request = register_request("u1", "0811111111");
        request.email = "nope".to_string();

        let err = f.service.register(request, image()).await.unwrap_err();
        assert!(matches!(err, GatepassError::Validation(_)));
        assert_eq!(f.repo.exists_calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_get_distinct_uids() {
        let f = fixture();
        let service = Arc::new(f.service);

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .register(register_request(&format!("u{i}"), &format!("08{i:08}")), image())
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let uids: HashSet<String> = f.repo.all().into_iter().map(|u| u.uid).collect();
        assert_eq!(uids.len(), 40);
    }

    #[tokio::test]
    async fn test_get_by_id_is_served_from_cache_after_first_read() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));

        let first = f.service.get_by_id("u1").await.unwrap();
        assert_eq!(f.repo.find_by_id_calls(), 1);
        assert_eq!(f.cache.set_calls(), 1);

        let second = f.service.get_by_id("u1").await.unwrap();
        assert_eq!(f.repo.find_by_id_calls(), 1);
        assert_eq!(f.cache.set_calls(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_is_not_cached() {
        let f = fixture();

        let err = f.service.get_by_id("ghost").await.unwrap_err();
        assert!(matches!(err, GatepassError::NotFound { .. }));
        assert_eq!(f.cache.set_calls(), 0);
    }

    #[tokio::test]
    async fn test_failing_cache_never_fails_reads() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));
        f.cache.fail_all();

        let user = f.service.get_by_id("u1").await.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(f.service.get_all().await.unwrap().len(), 1);

        let scanned = f.service.scan_qr("u1").await.unwrap();
        assert!(scanned.last_entered.is_some());
    }

    #[tokio::test]
    async fn test_disabled_cache_gives_same_results() {
        let cached = fixture();
        let uncached = {
            let repo = Arc::new(InMemoryUserRepository::new());
            let clock = cached.clock.clone();
            let service = UserServiceImpl::new(
                repo.clone(),
                Arc::new(crate::cache::RedisCacheService::disabled()),
                Arc::new(storage_ok()),
                Arc::new(issuer_ok()),
                clock,
                settings(),
            );
            (repo, service)
        };

        for repo in [&cached.repo, &uncached.0] {
            repo.insert(test_user("u1", "0811111111"));
            repo.insert(test_user("u2", "0822222222"));
        }

        for service in [&cached.service, &uncached.1] {
            assert_eq!(service.get_all().await.unwrap().len(), 2);
            assert_eq!(service.get_by_phone("0822222222").await.unwrap().id, "u2");
            service.scan_qr("u1").await.unwrap();
            assert!(matches!(
                service.scan_qr("u1").await,
                Err(GatepassError::AlreadyEntered(_))
            ));
            assert_eq!(service.add_staff("0822222222").await.unwrap().role, UserRole::Staff);
            assert!(service.get_by_id("u1").await.unwrap().last_entered.is_some());
        }
    }

    #[tokio::test]
    async fn test_get_all_and_by_name() {
        let f = fixture();
        let mut somchai = test_user("u1", "0811111111");
        somchai.name = "Somchai Jaidee".to_string();
        let mut dao = test_user("u2", "0822222222");
        dao.name = "Dao Rakdee".to_string();
        f.repo.insert(somchai);
        f.repo.insert(dao);

        assert_eq!(f.service.get_all().await.unwrap().len(), 2);

        let found = f.service.get_by_name("SOMCHAI").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "u1");
        assert!(f.cache.contains(&cache_keys::users_by_name("somchai")));
    }

    #[tokio::test]
    async fn test_get_by_phone_not_found() {
        let f = fixture();
        let err = f.service.get_by_phone("0899999999").await.unwrap_err();
        assert!(matches!(err, GatepassError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_sign_in_issues_token() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));

        let token = f
            .service
            .sign_in(SignInRequest {
                id: "u1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(token.access_token, "token-u1");

        let err = f
            .service
            .sign_in(SignInRequest {
                id: "ghost".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatepassError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_qr_url_encodes_id() {
        let f = fixture();
        f.repo.insert(test_user("u-1", "0811111111"));

        let qr = f.service.get_qr_url("u-1").await.unwrap();
        assert_eq!(qr.user_id, "u-1");
        assert_eq!(qr.qr_url, "https://qr.example.com/?data=u-1");

        assert!(matches!(
            f.service.get_qr_url("ghost").await,
            Err(GatepassError::NotFound { .. })
        ));
    }

    #[test]
    fn test_qr_url_escapes_reserved_characters() {
        assert_eq!(
            settings().qr_url("a&b c"),
            "https://qr.example.com/?data=a%26b+c"
        );
    }

    #[tokio::test]
    async fn test_scan_qr_twice_same_day() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));

        let first = f.service.scan_qr("u1").await.unwrap();
        let entered = first.last_entered.expect("entry recorded");
        assert_eq!(entered, f.clock.now());

        f.clock.advance(chrono::Duration::hours(3));
        let err = f.service.scan_qr("u1").await.unwrap_err();
        let GatepassError::AlreadyEntered(current) = err else {
            panic!("expected AlreadyEntered, got {err:?}");
        };
        assert_eq!(current.last_entered, Some(entered));
        assert_eq!(f.repo.get("u1").unwrap().last_entered, Some(entered));
        assert_eq!(f.repo.record_entry_calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_scan_does_not_invalidate_cache() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));
        f.service.scan_qr("u1").await.unwrap();
        let deletes = f.cache.delete_calls();

        assert!(f.service.scan_qr("u1").await.is_err());
        assert_eq!(f.cache.delete_calls(), deletes);
    }

    #[tokio::test]
    async fn test_scan_qr_again_next_day() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));

        f.service.scan_qr("u1").await.unwrap();
        f.clock.advance(chrono::Duration::days(1));

        let second = f.service.scan_qr("u1").await.unwrap();
        assert_eq!(second.last_entered, Some(f.clock.now()));
    }

    #[tokio::test]
    async fn test_scan_qr_day_boundary_follows_configured_offset() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));

        // 23:30 +07:00 on 2025-03-01
        f.clock.set(Utc.with_ymd_and_hms(2025, 3, 1, 16, 30, 0).unwrap());
        f.service.scan_qr("u1").await.unwrap();

        // 00:10 +07:00 on 2025-03-02, still 2025-03-01 in UTC
        f.clock.set(Utc.with_ymd_and_hms(2025, 3, 1, 17, 10, 0).unwrap());
        assert!(f.service.scan_qr("u1").await.is_ok());
    }

    #[tokio::test]
    async fn test_scan_qr_with_stale_cache_reports_already_entered() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));

        // Warm the cache, then record an entry behind its back.
        f.service.get_by_id("u1").await.unwrap();
        let now = f.clock.now();
        f.repo.set_last_entered("u1", now);

        let err = f.service.scan_qr("u1").await.unwrap_err();
        let GatepassError::AlreadyEntered(current) = err else {
            panic!("expected AlreadyEntered, got {err:?}");
        };
        assert_eq!(current.last_entered, Some(now));
        assert!(f.cache.deleted(&cache_keys::user_by_id("u1")));
    }

    #[tokio::test]
    async fn test_scan_qr_unknown_user() {
        let f = fixture();
        assert!(matches!(
            f.service.scan_qr("ghost").await,
            Err(GatepassError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_add_staff_on_staff_user_does_not_write() {
        let f = fixture();
        let mut staff = test_user("u1", "0811111111");
        staff.change_role(UserRole::Staff);
        f.repo.insert(staff);

        let err = f.service.add_staff("0811111111").await.unwrap_err();
        let GatepassError::AlreadyStaff(current) = err else {
            panic!("expected AlreadyStaff, got {err:?}");
        };
        assert_eq!(current.id, "u1");
        assert_eq!(f.repo.update_calls(), 0);
        assert_eq!(f.repo.get("u1").unwrap().role, UserRole::Staff);
    }

    #[tokio::test]
    async fn test_add_staff_promotes_member_and_invalidates() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));
        f.service.get_by_id("u1").await.unwrap();
        f.service.get_all().await.unwrap();

        let updated = f.service.add_staff("0811111111").await.unwrap();

        assert_eq!(updated.role, UserRole::Staff);
        assert_eq!(f.repo.get("u1").unwrap().role, UserRole::Staff);
        assert!(f.cache.deleted(&cache_keys::user_by_id("u1")));
        assert!(f.cache.deleted(&cache_keys::all_users()));
        assert!(!f.cache.contains(&cache_keys::user_by_id("u1")));

        let reread = f.service.get_by_id("u1").await.unwrap();
        assert_eq!(reread.role, UserRole::Staff);
    }

    #[tokio::test]
    async fn test_add_staff_with_stale_phone_cache_keeps_entry() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));
        f.cache.fail_deletes();

        // The phone entry is cached before the scan and never invalidated.
        f.service.get_by_phone("0811111111").await.unwrap();
        let entered = f.service.scan_qr("u1").await.unwrap().last_entered;
        assert!(entered.is_some());

        let promoted = f.service.add_staff("0811111111").await.unwrap();
        assert_eq!(promoted.role, UserRole::Staff);
        assert_eq!(promoted.last_entered, entered);
        assert_eq!(f.repo.get("u1").unwrap().last_entered, entered);

        f.clock.advance(chrono::Duration::hours(1));
        assert!(matches!(
            f.service.scan_qr("u1").await,
            Err(GatepassError::AlreadyEntered(_))
        ));
        assert_eq!(f.repo.get("u1").unwrap().last_entered, entered);
    }

    #[tokio::test]
    async fn test_update_with_stale_copy_does_not_touch_entry() {
        let f = fixture();
        let stale = test_user("u1", "0811111111");
        f.repo.insert(stale.clone());

        // A scan lands between a reader's load and its write.
        f.service.scan_qr("u1").await.unwrap();
        let entered = f.repo.get("u1").unwrap().last_entered;

        let mut promoted = stale;
        promoted.change_role(UserRole::Staff);
        let written = f.repo.update(&promoted).await.unwrap();

        assert_eq!(written.role, UserRole::Staff);
        assert_eq!(written.last_entered, entered);
        assert_eq!(f.repo.get("u1").unwrap().last_entered, entered);
    }

    #[tokio::test]
    async fn test_role_and_profile_updates_keep_last_entered() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));
        f.service.scan_qr("u1").await.unwrap();
        let entered = f.repo.get("u1").unwrap().last_entered;
        assert!(entered.is_some());

        let updated = f
            .service
            .update_role(
                "u1",
                UpdateRoleRequest {
                    role: UserRole::Admin,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.last_entered, entered);

        let updated = f
            .service
            .update_profile(
                "u1",
                UpdateUserRequest {
                    faculty: Some("Law".to_string()),
                    ..UpdateUserRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.last_entered, entered);
        assert_eq!(f.repo.get("u1").unwrap().last_entered, entered);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_scans_admit_exactly_one() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));
        let service = Arc::new(f.service);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.scan_qr("u1").await })
            })
            .collect();

        let mut admitted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(GatepassError::AlreadyEntered(_)) => rejected += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(rejected, 15);
        assert!(f.repo.get("u1").unwrap().last_entered.is_some());
    }

    #[tokio::test]
    async fn test_add_staff_demotes_admin() {
        let f = fixture();
        let mut admin = test_user("u1", "0811111111");
        admin.change_role(UserRole::Admin);
        f.repo.insert(admin);

        let updated = f.service.add_staff("0811111111").await.unwrap();
        assert_eq!(updated.role, UserRole::Staff);
    }

    #[tokio::test]
    async fn test_update_role() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));

        let updated = f
            .service
            .update_role(
                "u1",
                UpdateRoleRequest {
                    role: UserRole::Admin,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.role, UserRole::Admin);
        assert!(f.cache.deleted(&cache_keys::user_by_phone("0811111111")));
    }

    #[tokio::test]
    async fn test_update_profile_invalidates_old_and_new_phone() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));

        let updated = f
            .service
            .update_profile(
                "u1",
                UpdateUserRequest {
                    phone: Some("0822222222".to_string()),
                    faculty: Some("Law".to_string()),
                    ..UpdateUserRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.phone, "0822222222");
        assert_eq!(updated.faculty.as_deref(), Some("Law"));
        assert!(f.cache.deleted(&cache_keys::user_by_phone("0811111111")));
        assert!(f.cache.deleted(&cache_keys::user_by_phone("0822222222")));
        assert!(f.cache.deleted(&cache_keys::all_users()));
    }

    #[tokio::test]
    async fn test_update_profile_validation_and_conflict() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));
        f.repo.insert(test_user("u2", "0822222222"));

        let invalid = f
            .service
            .update_profile(
                "u1",
                UpdateUserRequest {
                    email: Some("broken".to_string()),
                    ..UpdateUserRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(invalid, GatepassError::Validation(_)));
        assert_eq!(f.repo.update_calls(), 0);

        let conflict = f
            .service
            .update_profile(
                "u1",
                UpdateUserRequest {
                    phone: Some("0822222222".to_string()),
                    ..UpdateUserRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(conflict, GatepassError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let f = fixture();
        f.repo.insert(test_user("u1", "0811111111"));
        f.service.get_by_id("u1").await.unwrap();

        f.service.delete("u1").await.unwrap();

        assert!(f.repo.get("u1").is_none());
        assert!(!f.cache.contains(&cache_keys::user_by_id("u1")));
        assert!(f.cache.deleted(&cache_keys::user_by_phone("0811111111")));
        assert!(matches!(
            f.service.get_by_id("u1").await,
            Err(GatepassError::NotFound { .. })
        ));
        assert!(matches!(
            f.service.delete("u1").await,
            Err(GatepassError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_image() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_download()
            .withf(|bucket, key| bucket == "gatepass-images" && key == "cutu-2025/ABC234_me.png")
            .returning(|_, _| {
                Ok(StoredObject {
                    bytes: vec![1, 2, 3],
                    content_type: Some("image/png".to_string()),
                })
            });
        storage
            .expect_download()
            .returning(|_, key| Err(GatepassError::not_found("Image", key)));
        let f = fixture_with(storage, issuer_ok());

        let object = f.service.get_image("cutu-2025/ABC234_me.png").await.unwrap();
        assert_eq!(object.bytes, vec![1, 2, 3]);

        assert!(matches!(
            f.service.get_image("missing.png").await,
            Err(GatepassError::NotFound { .. })
        ));
        assert!(matches!(
            f.service.get_image("  ").await,
            Err(GatepassError::Validation(_))
        ));
    }

    #[test]
    fn test_settings_from_config() {
        let config = AppConfig::default();
        let settings = ServiceSettings::from_config(&config).unwrap();
        assert_eq!(settings.utc_offset.local_minus_utc(), 7 * 3600);
        assert_eq!(settings.image_key("ABC234", "me.png"), "cutu-2025/ABC234_me.png");

        let mut broken = AppConfig::default();
        broken.checkin.utc_offset_minutes = 24 * 60;
        assert!(matches!(
            ServiceSettings::from_config(&broken),
            Err(GatepassError::Configuration(_))
        ));
    }
}
