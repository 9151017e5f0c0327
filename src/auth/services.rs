use rand::RngCore;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::auth::error::AuthError;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo_types::User;

/// How long a password-reset token stays valid.
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

/// Create a new account. Email uniqueness is checked before username so a
/// request failing on both reports the email conflict. A concurrent insert
/// slipping past the checks is caught on the unique index and mapped to the
/// same errors.
pub async fn create_user(
    db: &PgPool,
    first_name: &str,
    last_name: &str,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    if User::find_by_email(db, email).await?.is_some() {
        return Err(AuthError::DuplicateEmail);
    }
    if User::find_by_username(db, username).await?.is_some() {
        return Err(AuthError::DuplicateUsername);
    }

    let password_hash = hash_password(password)?;
    let user = User::create(db, first_name, last_name, username, email, &password_hash)
        .await
        .map_err(map_unique_violation)?;

    info!(user_id = %user.id, username = %user.username, "user created");
    Ok(user)
}

/// Look up by email and compare the password against the stored hash.
/// Unknown email and wrong password both collapse into `InvalidCredentials`
/// so callers cannot probe which emails are registered.
pub async fn verify_credentials(
    db: &PgPool,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    let Some(user) = User::find_by_email(db, email).await? else {
        return Err(AuthError::InvalidCredentials);
    };
    if verify_password(password, &user.password_hash)? {
        Ok(user)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

pub async fn is_username_taken(db: &PgPool, username: &str) -> Result<bool, AuthError> {
    Ok(User::find_by_username(db, username).await?.is_some())
}

/// Generate a reset token for the account behind `email`, persist it with its
/// deadline and hand it back for delivery. Issuing again overwrites any
/// earlier pending token.
pub async fn issue_reset_token(db: &PgPool, email: &str) -> Result<(User, String), AuthError> {
    let Some(user) = User::find_by_email(db, email).await? else {
        return Err(AuthError::UserNotFound);
    };

    let token = generate_reset_token();
    let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    User::set_reset_token(db, user.id, &token, expires).await?;

    debug!(user_id = %user.id, "reset token issued");
    Ok((user, token))
}

/// Exchange a still-valid token for a password change. The lookup and the
/// clearing of the token happen in one conditional update, so a token can be
/// consumed at most once even under concurrent requests.
pub async fn consume_reset_token(
    db: &PgPool,
    token: &str,
    new_password: &str,
) -> Result<User, AuthError> {
    let password_hash = hash_password(new_password)?;
    let Some(user) = User::consume_reset_token(db, token, &password_hash).await? else {
        return Err(AuthError::InvalidOrExpiredToken);
    };

    info!(user_id = %user.id, "password reset via token");
    Ok(user)
}

/// 16 random bytes, hex-encoded: 32 printable characters, collision-negligible.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn map_unique_violation(e: anyhow::Error) -> AuthError {
    if let Some(db_err) = e
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
    {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_username_key") => AuthError::DuplicateUsername,
                _ => AuthError::DuplicateEmail,
            };
        }
    }
    AuthError::Transport(e)
}


#[cfg(test)]
mod db_tests {
    use super::*;

    async fn ada(db: &PgPool) -> User {
        create_user(db, "Ada", "Lovelace", "ada-l", "ada@x.com", "Str0ng!Pass")
            .await
            .expect("create user")
    }

    #[sqlx::test]
    async fn signup_then_login_roundtrip(db: PgPool) {
        let user = ada(&db).await;
        let found = verify_credentials(&db, "ada@x.com", "Str0ng!Pass")
            .await
            .expect("login with fresh credentials");
        assert_eq!(found.id, user.id);

        let err = verify_credentials(&db, "ada@x.com", "Wr0ng!Pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        let err = verify_credentials(&db, "nobody@x.com", "Str0ng!Pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[sqlx::test]
    async fn duplicate_email_reported_before_duplicate_username(db: PgPool) {
        ada(&db).await;

        // Same email and username: the email conflict wins.
        let err = create_user(&db, "Ada", "Byron", "ada-l", "ada@x.com", "Str0ng!Pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));

        let err = create_user(&db, "Ada", "Byron", "ada-l", "other@x.com", "Str0ng!Pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername));

        assert!(is_username_taken(&db, "ada-l").await.expect("taken check"));
        assert!(!is_username_taken(&db, "countess").await.expect("taken check"));
    }

    #[sqlx::test]
    async fn reset_token_is_consumed_exactly_once(db: PgPool) {
        let user = ada(&db).await;
        let (holder, token) = issue_reset_token(&db, "ada@x.com")
            .await
            .expect("issue token");
        assert_eq!(holder.id, user.id);

        let updated = consume_reset_token(&db, &token, "NewStr0ng!Pass")
            .await
            .expect("first consume");
        assert_eq!(updated.id, user.id);
        assert!(updated.password_reset_token.is_none());
        assert!(updated.password_reset_expires.is_none());
        verify_credentials(&db, "ada@x.com", "NewStr0ng!Pass")
            .await
            .expect("new password works");

        let err = consume_reset_token(&db, &token, "An0ther!Pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));
        verify_credentials(&db, "ada@x.com", "NewStr0ng!Pass")
            .await
            .expect("replay left the password alone");
    }

    #[sqlx::test]
    async fn expired_token_is_rejected_without_mutation(db: PgPool) {
        let user = ada(&db).await;
        let token = generate_reset_token();
        let expired = OffsetDateTime::now_utc() - Duration::minutes(1);
        User::set_reset_token(&db, user.id, &token, expired)
            .await
            .expect("store expired token");

        let err = consume_reset_token(&db, &token, "NewStr0ng!Pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));

        let current = User::find_by_email(&db, "ada@x.com")
            .await
            .expect("lookup")
            .expect("user still there");
        assert_eq!(current.password_hash, user.password_hash);
        assert_eq!(current.password_reset_token.as_deref(), Some(token.as_str()));
        verify_credentials(&db, "ada@x.com", "Str0ng!Pass")
            .await
            .expect("old password still valid");
    }

    #[sqlx::test]
    async fn issue_reset_token_for_unknown_email_fails(db: PgPool) {
        let err = issue_reset_token(&db, "nobody@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }
}
