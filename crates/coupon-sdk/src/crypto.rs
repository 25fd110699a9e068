use sha2::Sha256;
use sha3::{Digest, Keccak256};

use crate::address::Address;
use crate::class::CouponClass;

/// One ABI word
pub const WORD_LEN: usize = 32;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let result = Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Big-endian uint256 word
pub fn encode_uint(value: u64) -> [u8; WORD_LEN] {
    let mut word = [0u8; WORD_LEN];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Address left-padded to a full word
pub fn encode_address(address: &Address) -> [u8; WORD_LEN] {
    let mut word = [0u8; WORD_LEN];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// abi.encode(uint256 class, uint256 quantity, address account)
///
/// Issuer and verifier both go through this; the layout is fixed at three
/// 32-byte words in this order.
pub fn encode_coupon_payload(
    class: CouponClass,
    quantity: u64,
    address: &Address,
) -> [u8; 3 * WORD_LEN] {
    let mut payload = [0u8; 3 * WORD_LEN];
    payload[..WORD_LEN].copy_from_slice(&encode_uint(class.id() as u64));
    payload[WORD_LEN..2 * WORD_LEN].copy_from_slice(&encode_uint(quantity));
    payload[2 * WORD_LEN..].copy_from_slice(&encode_address(address));
    payload
}

/// keccak256(abi.encode(class, quantity, address))
pub fn coupon_digest(class: CouponClass, quantity: u64, address: &Address) -> [u8; 32] {
    keccak256(&encode_coupon_payload(class, quantity, address))
}
