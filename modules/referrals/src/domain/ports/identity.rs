use uuid::Uuid;

/// Issues unique record identifiers. Implementations must not derive ids
/// from wall-clock time.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Uuid;
}

/// Proposes referral codes. Uniqueness is checked by the caller against the
/// record store, so a generator may repeat itself.
pub trait ReferralCodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}
