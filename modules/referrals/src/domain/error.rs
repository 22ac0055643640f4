use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User not found: {id}")]
    UserNotFound { id: Uuid },

    #[error("No user owns referral code '{code}'")]
    ReferrerNotFound { code: String },

    #[error("Referral code '{code}' belongs to the referred user")]
    SelfReferral { code: String },

    #[error("User with username '{username}' already exists")]
    UsernameAlreadyExists { username: String },

    #[error("User with email '{email}' already exists")]
    EmailAlreadyExists { email: String },

    #[error("Invalid email format: '{email}'")]
    InvalidEmail { email: String },

    #[error("Username cannot be empty")]
    EmptyUsername,

    #[error("Username too long: {len} characters (max: {max})")]
    UsernameTooLong { len: usize, max: usize },

    #[error("No unique referral code after {attempts} attempts")]
    ReferralCodeExhausted { attempts: usize },

    /// Fatal: a traversal ran past the configured depth, which only a cyclic
    /// referrer graph (or a misconfigured limit) can cause.
    #[error("Referral chain deeper than {max} levels; the referrer graph may contain a cycle")]
    ChainDepthExceeded { max: usize },

    #[error("Crediting {amount} to user {user_id} would overflow its earnings")]
    EarningsOverflow { user_id: Uuid, amount: u64 },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn user_not_found(id: Uuid) -> Self {
        Self::UserNotFound { id }
    }

    pub fn referrer_not_found(code: impl Into<String>) -> Self {
        Self::ReferrerNotFound { code: code.into() }
    }

    pub fn self_referral(code: impl Into<String>) -> Self {
        Self::SelfReferral { code: code.into() }
    }

    pub fn username_already_exists(username: String) -> Self {
        Self::UsernameAlreadyExists { username }
    }

    pub fn email_already_exists(email: String) -> Self {
        Self::EmailAlreadyExists { email }
    }

    pub fn invalid_email(email: String) -> Self {
        Self::InvalidEmail { email }
    }

    pub fn empty_username() -> Self {
        Self::EmptyUsername
    }

    pub fn username_too_long(len: usize, max: usize) -> Self {
        Self::UsernameTooLong { len, max }
    }

    pub fn referral_code_exhausted(attempts: usize) -> Self {
        Self::ReferralCodeExhausted { attempts }
    }

    pub fn chain_depth_exceeded(max: usize) -> Self {
        Self::ChainDepthExceeded { max }
    }

    pub fn earnings_overflow(user_id: Uuid, amount: u64) -> Self {
        Self::EarningsOverflow { user_id, amount }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}
