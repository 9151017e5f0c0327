use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::dto::SignupRequest;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref ALPHA_RE: Regex = Regex::new(r"^[A-Za-z]+$").unwrap();
}

/// Trim and lowercase. Dots in the local part are preserved.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn check_username(username: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if username.is_empty() {
        errors.push("Please enter a username!".into());
        return errors;
    }
    if username.chars().any(char::is_whitespace) {
        errors.push("Username cannot have spaces. Try using a dash!".into());
    }
    if username.chars().count() < 3 {
        errors.push("Your username must be at least 3 characters long!".into());
    }
    errors
}

pub fn check_email(email: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if email.is_empty() {
        errors.push("Please enter an email!".into());
    } else if !EMAIL_RE.is_match(email) {
        errors.push("Please ensure your email address is valid.".into());
    }
    errors
}

pub fn check_password(password: &str) -> Vec<String> {
    let len = password.chars().count();
    let strong = (8..=30).contains(&len)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_ascii_alphanumeric());
    if strong {
        Vec::new()
    } else {
        vec![
            "Your password needs to be between 8 and 30 characters long and contain \
             at least one lowercase letter, uppercase letter, number and special character."
                .into(),
        ]
    }
}

fn check_name(field: &str, value: &str) -> Vec<String> {
    if value.is_empty() {
        vec![format!("Please enter a {field} name!")]
    } else if !ALPHA_RE.is_match(value) {
        vec![format!(
            "Does your {field} name really have a number or special character in it? \
             Please try again!"
        )]
    } else {
        Vec::new()
    }
}

pub fn check_signup(payload: &SignupRequest) -> Vec<String> {
    let mut errors = Vec::new();
    errors.extend(check_name("first", &payload.first_name));
    errors.extend(check_name("last", &payload.last_name));
    errors.extend(check_username(&payload.username));
    errors.extend(check_email(&payload.email));
    errors.extend(check_password(&payload.password));
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ada() -> SignupRequest {
        SignupRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            username: "ada-l".into(),
            email: "ada@x.com".into(),
            password: "Str0ng!Pass".into(),
        }
    }

    #[test]
    fn accepts_valid_signup() {
        assert!(check_signup(&ada()).is_empty());
    }

    #[test]
    fn rejects_username_with_spaces() {
        let errors = check_username("ada l");
        assert!(errors.iter().any(|e| e.contains("spaces")));
    }

    #[test]
    fn rejects_short_username() {
        let errors = check_username("al");
        assert!(errors.iter().any(|e| e.contains("3 characters")));
    }

    #[test]
    fn rejects_missing_username() {
        assert_eq!(check_username(""), vec!["Please enter a username!"]);
    }

    #[test]
    fn rejects_bad_email() {
        assert!(!check_email("not-an-email").is_empty());
        assert!(!check_email("a b@x.com").is_empty());
        assert!(check_email("ada@x.com").is_empty());
    }

    #[test]
    fn normalizes_email_preserving_dots() {
        assert_eq!(normalize_email("  Ada.L@X.Com "), "ada.l@x.com");
    }

    #[test]
    fn password_needs_all_character_classes() {
        assert!(check_password("Str0ng!Pass").is_empty());
        assert!(!check_password("str0ng!pass").is_empty()); // no uppercase
        assert!(!check_password("Strong!Pass").is_empty()); // no digit
        assert!(!check_password("Str0ngPass").is_empty()); // no special
        assert!(!check_password("St0!p").is_empty()); // too short
        assert!(!check_password(&"Aa1!".repeat(10)).is_empty()); // too long
    }

    #[test]
    fn rejects_numeric_name() {
        let mut payload = ada();
        payload.first_name = "Ada2".into();
        let errors = check_signup(&payload);
        assert!(errors.iter().any(|e| e.contains("first name")));
    }
}
