use std::future::Future;
use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::auth::dto::{GateResult, LoginPrompt, LoginResult, RegisterFailure, RegisterResult};
use crate::auth::repo_types::User;
use crate::auth::services::{validate_new_account, Credentials};
use crate::auth::session::Session;
use crate::error::AuthError;

/// Outcome of a gated call: the action's value, or the prompt shown instead.
#[derive(Debug)]
pub enum Gated<T> {
    Allowed(T),
    Denied(LoginPrompt),
}

/// Session-gated access facade. Login and registration are the only
/// ungated entry points; everything else goes through `with_auth`.
#[derive(Clone)]
pub struct AccessGate {
    creds: Arc<Credentials>,
    password_min_length: usize,
}

impl AccessGate {
    pub fn new(creds: Arc<Credentials>, password_min_length: usize) -> Self {
        Self {
            creds,
            password_min_length,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.creds
    }

    pub fn token_ttl(&self) -> Duration {
        self.creds.token_ttl()
    }

    /// Re-derives the user from the session token on every call. A token
    /// that no longer verifies is dropped from the session.
    async fn resolve(&self, session: &mut Session) -> Result<Option<User>, AuthError> {
        let Some(token) = session.token() else {
            return Ok(None);
        };
        let user = self
            .creds
            .verify_token(token, OffsetDateTime::now_utc())
            .await?;
        if user.is_none() {
            session.clear();
        }
        Ok(user)
    }

    pub async fn with_auth<T, F, Fut>(
        &self,
        session: &mut Session,
        action: F,
    ) -> Result<Gated<T>, AuthError>
    where
        F: FnOnce(User) -> Fut,
        Fut: Future<Output = T>,
    {
        match self.resolve(session).await? {
            Some(user) => Ok(Gated::Allowed(action(user).await)),
            None => Ok(Gated::Denied(LoginPrompt::default())),
        }
    }

    pub async fn gate(&self, session: &mut Session) -> Result<GateResult, AuthError> {
        let user = self.resolve(session).await?;
        Ok(GateResult {
            authenticated: user.is_some(),
            user: user.as_ref().map(Into::into),
        })
    }

    pub async fn login(
        &self,
        session: &mut Session,
        email: &str,
        password: &str,
    ) -> Result<LoginResult, AuthError> {
        let email = email.trim();
        let Some(user) = self.creds.authenticate(email, password).await? else {
            warn!("login rejected");
            return Ok(LoginResult::rejected());
        };

        let token = self.creds.issue_token(user.id, OffsetDateTime::now_utc())?;
        session.store_token(token.clone());
        info!(user_id = %user.id, "user logged in");
        Ok(LoginResult::success(token))
    }

    /// Validation and duplicate-email failures are reported in the result;
    /// storage and crypto failures propagate.
    pub async fn register(
        &self,
        session: &mut Session,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<RegisterResult, AuthError> {
        let email = email.trim();
        let created = match validate_new_account(email, password, full_name, self.password_min_length)
        {
            Ok(()) => self.creds.register(email, password, full_name).await,
            Err(e) => Err(e),
        };

        let user = match created {
            Ok(user) => user,
            Err(e) => {
                let kind = match e {
                    AuthError::DuplicateEmail => RegisterFailure::DuplicateEmail,
                    AuthError::InvalidEmail => RegisterFailure::InvalidEmail,
                    AuthError::PasswordTooShort { .. } => RegisterFailure::PasswordTooShort,
                    AuthError::FieldTooLong { .. } => RegisterFailure::FieldTooLong,
                    other => return Err(other),
                };
                warn!(reason = ?kind, "registration rejected");
                return Ok(RegisterResult::failure(kind, &e));
            }
        };

        let token = self.creds.issue_token(user.id, OffsetDateTime::now_utc())?;
        session.store_token(token);
        Ok(RegisterResult::success(&user))
    }

    /// Client-side only: the token stays cryptographically valid until it
    /// expires.
    pub fn logout(&self, session: &mut Session) {
        if !session.is_anonymous() {
            info!("user logged out");
        }
        session.clear();
    }
}
