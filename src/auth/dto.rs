use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::error::AuthError;

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub is_superuser: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            is_superuser: user.is_superuser,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoginResult {
    pub fn success(token: String) -> Self {
        Self {
            ok: true,
            token: Some(token),
            message: None,
        }
    }

    /// One outcome for every kind of bad login.
    pub fn rejected() -> Self {
        Self {
            ok: false,
            token: None,
            message: Some(AuthError::InvalidCredentials.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterFailure {
    DuplicateEmail,
    InvalidEmail,
    PasswordTooShort,
    FieldTooLong,
}

#[derive(Debug, Serialize)]
pub struct RegisterResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RegisterFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RegisterResult {
    pub fn success(user: &User) -> Self {
        Self {
            ok: true,
            user: Some(user.into()),
            error: None,
            message: None,
        }
    }

    pub fn failure(kind: RegisterFailure, err: &AuthError) -> Self {
        Self {
            ok: false,
            user: None,
            error: Some(kind),
            message: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GateResult {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
}

/// Returned in place of a gated action's result for anonymous callers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoginPrompt {
    pub authenticated: bool,
    pub prompt: &'static str,
    pub message: &'static str,
}

impl Default for LoginPrompt {
    fn default() -> Self {
        Self {
            authenticated: false,
            prompt: "login_or_register",
            message: "please log in or register to continue",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_login_has_no_token() {
        let json = serde_json::to_value(LoginResult::rejected()).unwrap();
        assert_eq!(json["ok"], false);
        assert!(json.get("token").is_none());
        assert_eq!(json["message"], "invalid email or password");
    }

    #[test]
    fn register_failure_serializes_code() {
        let res = RegisterResult::failure(RegisterFailure::DuplicateEmail, &AuthError::DuplicateEmail);
        let json = serde_json::to_value(res).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "duplicate_email");
        assert_eq!(json["message"], "email already registered");
    }

    #[test]
    fn prompt_shape() {
        let json = serde_json::to_value(LoginPrompt::default()).unwrap();
        assert_eq!(json["authenticated"], false);
        assert_eq!(json["prompt"], "login_or_register");
    }
}
