use axum::{
    extract::{FromRef, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthData, Envelope, ForgotPasswordRequest, LoginRequest, PublicUser,
            ResetPasswordRequest, SignupRequest, UsernameRequest,
        },
        error::AuthError,
        extractors::CurrentUser,
        jwt::JwtKeys,
        services, validate,
    },
    mailer::{password_changed_email, reset_request_email},
    state::AppState,
};

const GENERIC_FAILURE: &str = "Something went wrong. Try again!";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout))
        .route("/auth/check-valid-username", post(check_valid_username))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset/:token", post(reset_password))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api", get(api_home))
        .route("/api/me", get(get_me))
}

/// Maps a domain failure onto the response envelope. Transport failures get a
/// generic message; everything else speaks for itself.
fn failure<T: Serialize>(err: AuthError) -> Envelope<T> {
    match err {
        AuthError::Transport(e) => {
            error!(error = %e, "transport failure");
            Envelope::fail_one(GENERIC_FAILURE)
        }
        other => Envelope::fail_one(other.to_string()),
    }
}

/// POST /auth/signup
/// Create a new local account and log it in.
#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Json<Envelope<AuthData>> {
    payload.first_name = payload.first_name.trim().to_string();
    payload.last_name = payload.last_name.trim().to_string();
    payload.username = payload.username.trim().to_string();
    payload.email = validate::normalize_email(&payload.email);

    let errors = validate::check_signup(&payload);
    if !errors.is_empty() {
        warn!(username = %payload.username, "signup validation failed");
        return Json(Envelope::fail(errors));
    }

    let user = match services::create_user(
        &state.db,
        &payload.first_name,
        &payload.last_name,
        &payload.username,
        &payload.email,
        &payload.password,
    )
    .await
    {
        Ok(u) => u,
        Err(e) => return Json(failure(e)),
    };

    let keys = JwtKeys::from_ref(&state);
    let token = match keys.sign(user.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign failed");
            return Json(Envelope::fail_one(GENERIC_FAILURE));
        }
    };

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Json(Envelope::data(
        "Signed up and logged in!",
        AuthData::new(&user, token),
    ))
}

/// POST /auth/login
/// Sign in using email and password.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Json<Envelope<AuthData>> {
    payload.email = validate::normalize_email(&payload.email);

    let errors = validate::check_email(&payload.email);
    if !errors.is_empty() {
        return Json(Envelope::fail(errors));
    }

    let user = match services::verify_credentials(&state.db, &payload.email, &payload.password)
        .await
    {
        Ok(u) => u,
        Err(e) => {
            warn!(email = %payload.email, "login failed");
            return Json(failure(e));
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let token = match keys.sign(user.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign failed");
            return Json(Envelope::fail_one(GENERIC_FAILURE));
        }
    };

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Json(Envelope::data(
        "Success! You are logged in.",
        AuthData::new(&user, token),
    ))
}

/// GET /auth/logout
/// Tokens are stateless, so there is nothing to revoke server-side; the
/// client drops its copy. Succeeds whether or not a valid token was sent.
#[instrument(skip_all)]
pub async fn logout(user: Option<CurrentUser>) -> Json<Envelope> {
    if let Some(CurrentUser(user)) = user {
        info!(user_id = %user.id, "user logged out");
    }
    Json(Envelope::success())
}

/// POST /auth/check-valid-username
#[instrument(skip(state))]
pub async fn check_valid_username(
    State(state): State<AppState>,
    Json(payload): Json<UsernameRequest>,
) -> Json<Envelope> {
    let errors = validate::check_username(payload.username.trim());
    if !errors.is_empty() {
        return Json(Envelope::fail(errors));
    }

    match services::is_username_taken(&state.db, payload.username.trim()).await {
        Ok(true) => Json(Envelope::fail_one(
            "Sorry, this username is already taken.",
        )),
        Ok(false) => Json(Envelope::ok("Username is valid!")),
        Err(e) => Json(failure(e)),
    }
}

/// POST /auth/forgot-password
/// Create a random token, then send the user an email with a reset link.
/// The response does not reveal whether the email is registered.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Json<Envelope> {
    payload.email = validate::normalize_email(&payload.email);

    let errors = validate::check_email(&payload.email);
    if !errors.is_empty() {
        return Json(Envelope::fail(errors));
    }

    let sent_msg = format!(
        "An e-mail has been sent to {} with further instructions.",
        payload.email
    );

    let (user, token) = match services::issue_reset_token(&state.db, &payload.email).await {
        Ok(pair) => pair,
        Err(AuthError::UserNotFound) => {
            warn!(email = %payload.email, "forgot-password for unknown email");
            return Json(Envelope::ok(sent_msg));
        }
        Err(e) => return Json(failure(e)),
    };

    // The token is already durably stored; a failed send is reported but
    // does not clear it.
    let (subject, body) = reset_request_email(&state.config.frontend_url, &token);
    if let Err(e) = state.mailer.send(&user.email, &subject, &body).await {
        error!(error = %e, user_id = %user.id, "reset email dispatch failed");
        return Json(Envelope::fail_one(GENERIC_FAILURE));
    }

    info!(user_id = %user.id, "reset email sent");
    Json(Envelope::ok(sent_msg))
}

/// POST /auth/reset/:token
/// Exchange a valid reset token for a new password.
#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Json<Envelope> {
    let errors = validate::check_password(&payload.password);
    if !errors.is_empty() {
        return Json(Envelope::fail(errors));
    }

    let user = match services::consume_reset_token(&state.db, &token, &payload.password).await {
        Ok(u) => u,
        Err(e) => {
            warn!("reset token rejected");
            return Json(failure(e));
        }
    };

    // Password change is committed at this point; the confirmation mail is
    // best effort on top of it.
    let (subject, body) = password_changed_email(&state.config.frontend_url, &user.email);
    if let Err(e) = state.mailer.send(&user.email, &subject, &body).await {
        error!(error = %e, user_id = %user.id, "confirmation email dispatch failed");
        return Json(Envelope::fail_one(GENERIC_FAILURE));
    }

    Json(Envelope::ok(format!(
        "Success! Your password has been changed. Use {} and your new password to \
         login at https://{}/login",
        user.email, state.config.frontend_url
    )))
}

/// GET /api
/// Authorized landing payload; the list of relevant content for the user
/// goes here.
#[instrument(skip_all)]
pub async fn api_home(CurrentUser(user): CurrentUser) -> Json<Envelope> {
    Json(Envelope::ok(format!("Welcome back, {}!", user.first_name)))
}

/// GET /api/me
#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}

#[cfg(test)]
mod logout_tests {
    use super::*;

    #[tokio::test]
    async fn logout_succeeds_without_bearer_token() {
        let Json(envelope) = logout(None).await;
        let json = serde_json::to_value(envelope).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true }));
    }
}
