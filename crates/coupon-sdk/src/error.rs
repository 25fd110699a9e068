use thiserror::Error;

pub type Result<T> = std::result::Result<T, SdkError>;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Key load failure: {0}")]
    KeyLoadFailure(String),

    #[error("Invalid coupon: {0}")]
    InvalidCoupon(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Issuance set integrity mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("Connected to chain {actual}, expected {expected}")]
    NetworkMismatch { expected: u64, actual: u64 },

    #[error("No eligible coupon for {0}")]
    NoEligibleCoupon(String),

    #[error("No account connected")]
    NotConnected,

    #[error("A mint is already in flight for this account")]
    MintInFlight,

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Mint rejected by ledger: {0}")]
    Rejected(String),

    #[error("Mint submission timed out after {0:?}")]
    SubmitTimeout(std::time::Duration),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Coupon service error: {0}")]
    CouponService(String),
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        SdkError::Serialization(e.to_string())
    }
}
