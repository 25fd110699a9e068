use thiserror::Error;

use coupon_sdk::CouponClass;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Every variant is a full rejection: a call that returns one of these has
/// changed nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Quantity must be non-zero")]
    ZeroQuantity,

    #[error("Incorrect Payment: expected {expected} wei, got {paid}")]
    IncorrectPayment { expected: u128, paid: u128 },

    #[error("Invalid coupon: {0}")]
    InvalidCoupon(String),

    #[error("Quota exceeded for {class}: {minted} minted + {requested} requested > {allotted} allotted")]
    QuotaExceeded {
        class: CouponClass,
        minted: u64,
        requested: u64,
        allotted: u64,
    },

    #[error("Unauthorized: caller is not the admin")]
    Unauthorized,

    #[error("Arithmetic overflow")]
    Overflow,
}
