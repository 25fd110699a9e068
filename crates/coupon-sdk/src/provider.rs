use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;

use crate::address::Address;
use crate::class::CouponClass;
use crate::coupon::Coupon;
use crate::error::Result;

/// Per-class mint counts for one address, as reported by the ledger
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MintCounters(pub BTreeMap<CouponClass, u64>);

impl MintCounters {
    pub fn get(&self, class: CouponClass) -> u64 {
        self.0.get(&class).copied().unwrap_or(0)
    }
}

/// A coupon-carrying mint call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintTransaction {
    pub from: Address,
    pub class: CouponClass,
    /// Units to mint in this call
    pub requested: u64,
    /// Quantity the coupon was signed for
    pub allotted: u64,
    pub coupon: Coupon,
    /// Attached payment in wei
    pub value: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    pub tx_hash: [u8; 32],
    pub first_token_id: u64,
    pub quantity: u64,
}

impl MintReceipt {
    pub fn tx_hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.tx_hash))
    }
}

/// Connection to the ledger through the user's wallet.
///
/// `send_mint` resolves once the transaction is final. A ledger rejection must
/// come back as `SdkError::Rejected` carrying the ledger's reason.
pub trait Provider: Send + Sync {
    fn chain_id(&self) -> impl Future<Output = Result<u64>> + Send;

    fn mint_counters(&self, account: Address) -> impl Future<Output = Result<MintCounters>> + Send;

    fn issuer_key(&self) -> impl Future<Output = Result<Address>> + Send;

    fn send_mint(&self, tx: MintTransaction) -> impl Future<Output = Result<MintReceipt>> + Send;
}
