use serde::Serialize;

use coupon_sdk::{Address, CouponClass};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum LedgerEvent {
    Minted {
        to: Address,
        class: CouponClass,
        quantity: u64,
        first_token_id: u64,
        /// Counter for (to, class) after this mint
        class_total: u64,
        paid: u128,
    },
    IssuerKeyRotated {
        previous: Address,
        new: Address,
    },
}
