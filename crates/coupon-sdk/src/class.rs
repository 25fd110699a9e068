use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SdkError};

/// Minting track a coupon belongs to.
///
/// The discriminant is what gets encoded into the coupon digest, so existing
/// values must never be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CouponClass {
    Presale = 0,
    Team = 1,
}

impl CouponClass {
    pub const ALL: [CouponClass; 2] = [CouponClass::Presale, CouponClass::Team];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            CouponClass::Presale => "presale",
            CouponClass::Team => "team",
        }
    }
}

impl fmt::Display for CouponClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CouponClass {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| SdkError::MalformedInput(format!("unknown coupon class: {}", s)))
    }
}

/// Presale price: 0.0002 ether
pub const PRESALE_PRICE_WEI: u128 = 200_000_000_000_000;

/// Pricing rule for one class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPolicy {
    pub payable: bool,
    /// Wei per unit, ignored when not payable
    pub price_per_unit: u128,
}

impl ClassPolicy {
    pub const fn free() -> Self {
        Self {
            payable: false,
            price_per_unit: 0,
        }
    }

    pub const fn priced(price_per_unit: u128) -> Self {
        Self {
            payable: true,
            price_per_unit,
        }
    }

    pub fn default_for(class: CouponClass) -> Self {
        match class {
            CouponClass::Presale => Self::priced(PRESALE_PRICE_WEI),
            CouponClass::Team => Self::free(),
        }
    }

    /// price_per_unit * quantity, `None` on overflow
    pub fn required_payment(&self, quantity: u64) -> Option<u128> {
        if !self.payable {
            return Some(0);
        }
        self.price_per_unit.checked_mul(quantity as u128)
    }
}
