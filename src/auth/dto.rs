use serde::{Deserialize, Serialize};

use crate::auth::repo_types::User;

/// Request body for signup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for the username availability check.
#[derive(Debug, Deserialize)]
pub struct UsernameRequest {
    pub username: String,
}

/// Request body for forgot-password.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Request body for reset-by-token; the token itself rides in the path.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorMsg {
    pub msg: String,
}

/// Uniform response body. Every auth endpoint answers HTTP 200; success or
/// failure is carried by the boolean, errors as a list of `{msg}` entries.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize = ()> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorMsg>>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success() -> Self {
        Self {
            success: true,
            msg: None,
            data: None,
            errors: None,
        }
    }

    pub fn ok(msg: impl Into<String>) -> Self {
        Self {
            msg: Some(msg.into()),
            ..Self::success()
        }
    }

    pub fn data(msg: impl Into<String>, data: T) -> Self {
        Self {
            msg: Some(msg.into()),
            data: Some(data),
            ..Self::success()
        }
    }

    pub fn fail(msgs: Vec<String>) -> Self {
        Self {
            success: false,
            msg: None,
            data: None,
            errors: Some(msgs.into_iter().map(|msg| ErrorMsg { msg }).collect()),
        }
    }

    pub fn fail_one(msg: impl Into<String>) -> Self {
        Self::fail(vec![msg.into()])
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Payload returned after signup or login: the public user plus a bearer token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    #[serde(flatten)]
    pub user: PublicUser,
    pub token: String,
}

impl AuthData {
    pub fn new(user: &User, token: String) -> Self {
        Self {
            user: user.into(),
            token,
        }
    }
}
