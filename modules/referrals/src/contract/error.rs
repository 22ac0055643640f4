use thiserror::Error;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferralsError {
    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error")]
    Internal,
}

impl ReferralsError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::Internal
    }
}

impl From<crate::domain::error::DomainError> for ReferralsError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            UserNotFound { id } => Self::not_found(format!("user {id}")),
            ReferrerNotFound { code } => Self::not_found(format!("referral code '{code}'")),
            SelfReferral { code } => {
                Self::validation(format!("User cannot be referred by own code '{code}'"))
            }
            UsernameAlreadyExists { username } => {
                Self::conflict(format!("Username '{username}' is taken"))
            }
            EmailAlreadyExists { email } => {
                Self::conflict(format!("Email '{email}' is already registered"))
            }
            InvalidEmail { email } => Self::validation(format!("Invalid email: {email}")),
            EmptyUsername => Self::validation("Username cannot be empty"),
            UsernameTooLong { len, max } => Self::validation(format!(
                "Username too long: {len} characters (max: {max})"
            )),
            EarningsOverflow { user_id, amount } => Self::validation(format!(
                "Crediting {amount} would overflow earnings of user {user_id}"
            )),
            ReferralCodeExhausted { .. } | ChainDepthExceeded { .. } | Database { .. } => {
                Self::internal()
            }
        }
    }
}
