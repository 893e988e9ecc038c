//! Input validation module

use crate::models::{
    CommentRequest, CreateUserRequest, RateDocumentRequest, ReviewDocumentRequest,
    UploadDocumentRequest,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' is too long (max {max} characters)")]
    TooLong { field: String, max: usize },

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange,

    #[error("Status must be one of: approved, rejected, archived")]
    InvalidReviewStatus,

    #[error("Onboarding progress must be between 0 and 100")]
    ProgressOutOfRange,
}

/// Validate a document upload request
pub fn validate_upload(input: &UploadDocumentRequest) -> Result<(), ValidationError> {
    if input.title.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "title".to_string(),
        });
    }
    if input.title.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "title".to_string(),
            max: 500,
        });
    }

    if input.uploader_id.is_none() {
        return Err(ValidationError::Required {
            field: "uploaderId".to_string(),
        });
    }

    if let Some(ref domain) = input.domain {
        if domain.len() > 255 {
            return Err(ValidationError::TooLong {
                field: "domain".to_string(),
                max: 255,
            });
        }
    }
    if let Some(ref region) = input.region {
        if region.len() > 255 {
            return Err(ValidationError::TooLong {
                field: "region".to_string(),
                max: 255,
            });
        }
    }

    Ok(())
}

/// Validate a review request: reviewer and a reachable target status
pub fn validate_review(input: &ReviewDocumentRequest) -> Result<(), ValidationError> {
    if input.user_id.is_none() {
        return Err(ValidationError::Required {
            field: "userId".to_string(),
        });
    }

    match input.status {
        None => Err(ValidationError::Required {
            field: "status".to_string(),
        }),
        Some(status) if !status.is_review_target() => Err(ValidationError::InvalidReviewStatus),
        Some(_) => Ok(()),
    }
}

/// Validate a rating request before any mutation
pub fn validate_rating(input: &RateDocumentRequest) -> Result<(), ValidationError> {
    if !(1..=5).contains(&input.rating) {
        return Err(ValidationError::RatingOutOfRange);
    }
    Ok(())
}

/// Validate a comment request
pub fn validate_comment(input: &CommentRequest) -> Result<(), ValidationError> {
    if input.text.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "text".to_string(),
        });
    }
    if input.text.len() > 4000 {
        return Err(ValidationError::TooLong {
            field: "text".to_string(),
            max: 4000,
        });
    }
    Ok(())
}

/// Validate a user registration request
pub fn validate_create_user(input: &CreateUserRequest) -> Result<(), ValidationError> {
    if input.username.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }
    if input.username.len() > 255 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 255,
        });
    }

    if input.password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if !is_valid_email(&input.email) {
        return Err(ValidationError::InvalidEmail);
    }

    if let Some(ref name) = input.display_name {
        if name.len() > 255 {
            return Err(ValidationError::TooLong {
                field: "displayName".to_string(),
                max: 255,
            });
        }
    }

    Ok(())
}

/// Validate an onboarding progress value
pub fn validate_progress(progress: i32) -> Result<(), ValidationError> {
    if !(0..=100).contains(&progress) {
        return Err(ValidationError::ProgressOutOfRange);
    }
    Ok(())
}

/// Simple email validation
fn is_valid_email(email: &str) -> bool {
    // Basic check: contains @ and at least one .
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let (local, domain) = (parts[0], parts[1]);

    !local.is_empty() && !domain.is_empty() && domain.contains('.') && domain.len() > 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentStatus, UserRole};
    use uuid::Uuid;

    fn upload_request(title: &str, uploader: Option<Uuid>) -> UploadDocumentRequest {
        serde_json::from_str::<UploadDocumentRequest>(&format!(
            r#"{{"title":{:?}}}"#,
            title
        ))
        .map(|mut req| {
            req.uploader_id = uploader;
            req
        })
        .unwrap()
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("user.name@domain.nl"));
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@domain.com"));
        assert!(!is_valid_email("user@"));
    }

    #[test]
    fn test_validate_upload_valid() {
        let input = upload_request("Intro to X", Some(Uuid::new_v4()));
        assert!(validate_upload(&input).is_ok());
    }

    #[test]
    fn test_validate_upload_blank_title() {
        let input = upload_request("   ", Some(Uuid::new_v4()));
        assert!(matches!(
            validate_upload(&input),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_upload_missing_uploader() {
        let input = upload_request("Intro to X", None);
        assert!(matches!(
            validate_upload(&input),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_review_requires_status() {
        let input = ReviewDocumentRequest {
            user_id: Some(Uuid::new_v4()),
            status: None,
            rejection_reason: None,
        };
        assert!(matches!(
            validate_review(&input),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_review_rejects_pending_target() {
        let input = ReviewDocumentRequest {
            user_id: Some(Uuid::new_v4()),
            status: Some(DocumentStatus::Pending),
            rejection_reason: None,
        };
        assert!(matches!(
            validate_review(&input),
            Err(ValidationError::InvalidReviewStatus)
        ));
    }

    #[test]
    fn test_validate_review_accepts_terminal_targets() {
        for status in [
            DocumentStatus::Approved,
            DocumentStatus::Rejected,
            DocumentStatus::Archived,
        ] {
            let input = ReviewDocumentRequest {
                user_id: Some(Uuid::new_v4()),
                status: Some(status),
                rejection_reason: None,
            };
            assert!(validate_review(&input).is_ok());
        }
    }

    #[test]
    fn test_validate_rating_bounds() {
        for rating in 1..=5 {
            let input = RateDocumentRequest {
                user_id: Uuid::new_v4(),
                rating,
            };
            assert!(validate_rating(&input).is_ok());
        }
        for rating in [0, 6, -1] {
            let input = RateDocumentRequest {
                user_id: Uuid::new_v4(),
                rating,
            };
            assert!(matches!(
                validate_rating(&input),
                Err(ValidationError::RatingOutOfRange)
            ));
        }
    }

    #[test]
    fn test_validate_comment_blank() {
        let input = CommentRequest {
            user_id: Uuid::new_v4(),
            text: "  ".to_string(),
        };
        assert!(matches!(
            validate_comment(&input),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_create_user_invalid_email() {
        let input = CreateUserRequest {
            username: "jan".to_string(),
            email: "not-an-email".to_string(),
            password: "secret".to_string(),
            display_name: None,
            role: UserRole::Consultant,
        };
        assert!(matches!(
            validate_create_user(&input),
            Err(ValidationError::InvalidEmail)
        ));
    }

    #[test]
    fn test_validate_progress_bounds() {
        assert!(validate_progress(0).is_ok());
        assert!(validate_progress(100).is_ok());
        assert!(matches!(
            validate_progress(101),
            Err(ValidationError::ProgressOutOfRange)
        ));
        assert!(matches!(
            validate_progress(-5),
            Err(ValidationError::ProgressOutOfRange)
        ));
    }
}
