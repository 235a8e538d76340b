use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::jwt::{TokenKeys, TokenRejection};
use crate::auth::password::Passwords;
use crate::auth::repo::{StoreError, UserStore};
use crate::auth::repo_types::{NewUser, User};
use crate::config::AuthConfig;
use crate::error::AuthError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Width of the `users` text columns.
pub const MAX_FIELD_LENGTH: usize = 255;

/// Shape checks run before any account is created.
pub fn validate_new_account(
    email: &str,
    password: &str,
    full_name: Option<&str>,
    min_length: usize,
) -> Result<(), AuthError> {
    if email.chars().count() > MAX_FIELD_LENGTH {
        return Err(AuthError::FieldTooLong {
            field: "email",
            max: MAX_FIELD_LENGTH,
        });
    }
    if !is_valid_email(email) {
        return Err(AuthError::InvalidEmail);
    }
    if password.chars().count() < min_length {
        return Err(AuthError::PasswordTooShort { min: min_length });
    }
    if full_name.is_some_and(|n| n.trim().chars().count() > MAX_FIELD_LENGTH) {
        return Err(AuthError::FieldTooLong {
            field: "full_name",
            max: MAX_FIELD_LENGTH,
        });
    }
    Ok(())
}

/// Credential & token manager: password checks, token issue and verification,
/// registration. Lookups and verification failures come back as `None`;
/// only storage outages surface as errors.
pub struct Credentials {
    users: Arc<dyn UserStore>,
    keys: TokenKeys,
    passwords: Passwords,
    // verified against when the email is unknown so both misses cost the same
    decoy_hash: String,
}

impl Credentials {
    pub fn new(users: Arc<dyn UserStore>, cfg: &AuthConfig) -> anyhow::Result<Self> {
        let passwords = Passwords::new(&cfg.hash)?;
        let decoy_hash = passwords.hash_password(&Uuid::new_v4().to_string())?;
        Ok(Self {
            users,
            keys: TokenKeys::from_config(cfg),
            passwords,
            decoy_hash,
        })
    }

    pub fn hash_password(&self, plain: &str) -> Result<String, AuthError> {
        self.passwords
            .hash_password(plain)
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    pub fn verify_password(&self, plain: &str, hash: &str) -> bool {
        self.passwords.verify_password(plain, hash)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            self.passwords.verify_password(password, &self.decoy_hash);
            debug!("authentication failed: unknown email");
            return Ok(None);
        };

        if !self.verify_password(password, &user.hashed_password) {
            debug!(user_id = %user.id, "authentication failed: password mismatch");
            return Ok(None);
        }
        if !user.is_active {
            debug!(user_id = %user.id, "authentication failed: inactive account");
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub fn issue_token(&self, user_id: Uuid, now: OffsetDateTime) -> Result<String, AuthError> {
        self.keys.sign(user_id, now)
    }

    pub fn token_ttl(&self) -> Duration {
        self.keys.ttl()
    }

    pub async fn verify_token(&self, token: &str, now: OffsetDateTime) -> Result<Option<User>, AuthError> {
        match self.check_token(token, now).await? {
            Ok(user) => Ok(Some(user)),
            Err(reason) => {
                debug!(%reason, "token rejected");
                Ok(None)
            }
        }
    }

    /// Same as `verify_token`, but keeps the reason a token was refused.
    /// The outer `Result` is reserved for storage failures.
    pub async fn check_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Result<User, TokenRejection>, AuthError> {
        let claims = match self.keys.verify(token, now) {
            Ok(claims) => claims,
            Err(reason) => return Ok(Err(reason)),
        };
        let outcome = match self.users.find_by_id(claims.sub).await? {
            None => Err(TokenRejection::UnknownSubject),
            Some(user) if !user.is_active => Err(TokenRejection::InactiveSubject),
            Some(user) => Ok(user),
        };
        Ok(outcome)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<User, AuthError> {
        self.create_account(email, password, full_name, false).await
    }

    /// Bootstrap path for operators; identical to `register` apart from the
    /// superuser flag.
    pub async fn register_superuser(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<User, AuthError> {
        self.create_account(email, password, full_name, true).await
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
        is_superuser: bool,
    ) -> Result<User, AuthError> {
        let hashed_password = self.hash_password(password)?;
        let new_user = NewUser {
            email: email.to_string(),
            hashed_password,
            full_name: full_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            is_superuser,
        };

        match self.users.insert(new_user).await {
            Ok(user) => {
                info!(user_id = %user.id, email = %user.email, is_superuser, "user registered");
                Ok(user)
            }
            Err(StoreError::Duplicate) => {
                warn!(email = %email, "email already registered");
                Err(AuthError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::test_auth_config;
    use crate::auth::repo::memory::MemoryUserStore;

    fn setup(ttl_minutes: i64) -> (Arc<MemoryUserStore>, Credentials) {
        let store = Arc::new(MemoryUserStore::default());
        let creds = Credentials::new(store.clone(), &test_auth_config(ttl_minutes))
            .expect("credentials build");
        (store, creds)
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("alice example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn new_account_validation() {
        assert!(validate_new_account("alice@example.com", "longenough", Some("Alice"), 8).is_ok());
        assert!(matches!(
            validate_new_account("alice@example.com", "short", None, 8),
            Err(AuthError::PasswordTooShort { min: 8 })
        ));
        assert!(matches!(
            validate_new_account("nope", "longenough", None, 8),
            Err(AuthError::InvalidEmail)
        ));
    }

    #[test]
    fn new_account_fields_fit_their_columns() {
        let local = "a".repeat(MAX_FIELD_LENGTH);
        let long_email = format!("{local}@example.com");
        assert!(is_valid_email(&long_email));
        assert!(matches!(
            validate_new_account(&long_email, "longenough", None, 8),
            Err(AuthError::FieldTooLong { field: "email", max: MAX_FIELD_LENGTH })
        ));

        let edge = format!("{}@example.com", "a".repeat(MAX_FIELD_LENGTH - "@example.com".len()));
        assert_eq!(edge.chars().count(), MAX_FIELD_LENGTH);
        assert!(validate_new_account(&edge, "longenough", None, 8).is_ok());

        let long_name = "n".repeat(MAX_FIELD_LENGTH + 1);
        assert!(matches!(
            validate_new_account("alice@example.com", "longenough", Some(&long_name), 8),
            Err(AuthError::FieldTooLong { field: "full_name", .. })
        ));
    }

    #[tokio::test]
    async fn register_then_duplicate() {
        let (_, creds) = setup(60);
        let user = creds
            .register("alice@example.com", "pw1", Some("Alice"))
            .await
            .expect("first registration");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.full_name.as_deref(), Some("Alice"));
        assert!(user.is_active);
        assert!(!user.is_superuser);
        assert_ne!(user.hashed_password, "pw1");

        let err = creds.register("alice@example.com", "other", None).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn superuser_registration_sets_flag() {
        let (_, creds) = setup(60);
        let admin = creds
            .register_superuser("admin@example.com", "admin-pass", Some("  "))
            .await
            .unwrap();
        assert!(admin.is_superuser);
        assert_eq!(admin.full_name, None);
    }

    #[tokio::test]
    async fn authenticate_outcomes() {
        let (store, creds) = setup(60);
        let user = creds.register("bob@example.com", "hunter22", None).await.unwrap();

        let found = creds.authenticate("bob@example.com", "hunter22").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let unknown = creds.authenticate("nobody@x.com", "anything").await.unwrap();
        let wrong = creds.authenticate("bob@example.com", "wrong").await.unwrap();
        assert!(unknown.is_none());
        assert!(wrong.is_none());

        // exact match only
        assert!(creds.authenticate("BOB@example.com", "hunter22").await.unwrap().is_none());

        store.set_active(user.id, false);
        assert!(creds.authenticate("bob@example.com", "hunter22").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn token_roundtrip_and_expiry() {
        let (_, creds) = setup(1440);
        let user = creds.register("carol@example.com", "password1", None).await.unwrap();
        let t0 = OffsetDateTime::now_utc();
        let token = creds.issue_token(user.id, t0).unwrap();

        let verified = creds.verify_token(&token, t0).await.unwrap();
        assert_eq!(verified.map(|u| u.id), Some(user.id));

        let later = t0 + Duration::minutes(1440) + Duration::seconds(1);
        assert!(creds.verify_token(&token, later).await.unwrap().is_none());
        assert_eq!(
            creds.check_token(&token, later).await.unwrap().unwrap_err(),
            TokenRejection::Expired
        );
    }

    #[tokio::test]
    async fn zero_ttl_token_rejected_at_issue_time() {
        let (_, creds) = setup(0);
        let user = creds.register("dave@example.com", "password1", None).await.unwrap();
        let t0 = OffsetDateTime::now_utc();
        let token = creds.issue_token(user.id, t0).unwrap();
        assert!(creds.verify_token(&token, t0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn token_for_missing_or_inactive_user_is_rejected() {
        let (store, creds) = setup(60);
        let now = OffsetDateTime::now_utc();

        let ghost = creds.issue_token(Uuid::new_v4(), now).unwrap();
        assert_eq!(
            creds.check_token(&ghost, now).await.unwrap().unwrap_err(),
            TokenRejection::UnknownSubject
        );

        let user = creds.register("erin@example.com", "password1", None).await.unwrap();
        let token = creds.issue_token(user.id, now).unwrap();
        store.set_active(user.id, false);
        assert_eq!(
            creds.check_token(&token, now).await.unwrap().unwrap_err(),
            TokenRejection::InactiveSubject
        );

        store.remove(user.id);
        assert!(creds.verify_token(&token, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn garbage_token_is_no_user() {
        let (_, creds) = setup(60);
        let now = OffsetDateTime::now_utc();
        assert!(creds.verify_token("invalid-token", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn storage_outage_propagates() {
        let (store, creds) = setup(60);
        let user = creds.register("frank@example.com", "password1", None).await.unwrap();
        let now = OffsetDateTime::now_utc();
        let token = creds.issue_token(user.id, now).unwrap();

        store.set_offline(true);
        assert!(matches!(
            creds.authenticate("frank@example.com", "password1").await,
            Err(AuthError::StorageUnavailable(_))
        ));
        assert!(matches!(
            creds.verify_token(&token, now).await,
            Err(AuthError::StorageUnavailable(_))
        ));
        assert!(matches!(
            creds.register("gina@example.com", "password1", None).await,
            Err(AuthError::StorageUnavailable(_))
        ));
    }
}
