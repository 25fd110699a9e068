pub mod address;
pub mod class;
pub mod client;
pub mod coupon;
pub mod crypto;
pub mod error;
pub mod http;
pub mod issuance;
pub mod provider;
pub mod source;

pub use address::Address;
pub use class::{ClassPolicy, CouponClass};
pub use client::{AccountView, ClientConfig, Eligibility, MintClient};
pub use coupon::{Coupon, CouponSigner};
pub use error::{Result, SdkError};
pub use issuance::{issue, Allowlist, CouponEntry, IssuanceReport, IssuanceSet};
pub use provider::{MintCounters, MintReceipt, MintTransaction, Provider};
pub use source::{CouponResponse, CouponSource, HttpCouponSource, StaticCoupons};
