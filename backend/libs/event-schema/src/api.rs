//! HTTP request and response bodies for `/api/v1`

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::Post;

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Post cannot be empty".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePostRequest {
    // keep the literal in sync with MAX_POST_CHARS
    #[validate(
        custom(function = "not_blank"),
        length(max = 500, message = "Post cannot exceed 500 characters")
    )]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub success: bool,
    pub post: Post,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Name must be between 3 and 50 characters"
    ))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(max = 200, message = "Bio cannot exceed 200 characters"))]
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Body form of the logout call; the `Authorization` header takes precedence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// User as exposed over the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub expires_at: i64,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_POST_CHARS;

    #[test]
    fn post_content_bounds() {
        let ok = CreatePostRequest {
            content: "x".repeat(MAX_POST_CHARS),
        };
        assert!(ok.validate().is_ok());

        let too_long = CreatePostRequest {
            content: "x".repeat(MAX_POST_CHARS + 1),
        };
        assert!(too_long.validate().is_err());

        let blank = CreatePostRequest {
            content: "   \n".into(),
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn post_length_counts_characters_not_bytes() {
        // 500 two-byte characters is still within bounds
        let req = CreatePostRequest {
            content: "é".repeat(MAX_POST_CHARS),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn register_rejects_short_name_and_bad_email() {
        let req = RegisterRequest {
            name: "al".into(),
            email: "not-an-email".into(),
            password: "secret1".into(),
            bio: None,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("password"));
    }

    #[test]
    fn logout_body_token_is_optional() {
        let req: LogoutRequest = serde_json::from_str("{}").unwrap();
        assert!(req.token.is_none());
    }
}
