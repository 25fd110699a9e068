/// Coupons are recoverable secp256k1 signatures over
/// keccak256(abi.encode(class, quantity, address)).
/// A coupon carries no class or quantity of its own; the verifier rebuilds the
/// digest from what the caller claims and checks who signed it.
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::Address;
use crate::class::CouponClass;
use crate::crypto::coupon_digest;
use crate::error::{Result, SdkError};

const V_OFFSET: u8 = 27;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    #[serde(with = "hex_word")]
    pub r: [u8; 32],
    #[serde(with = "hex_word")]
    pub s: [u8; 32],
    pub v: u8,
}

impl Coupon {
    fn recovery_id(&self) -> Result<RecoveryId> {
        let id = match self.v {
            0 | 1 => self.v,
            27 | 28 => self.v - V_OFFSET,
            other => {
                return Err(SdkError::InvalidCoupon(format!(
                    "unsupported recovery id {}",
                    other
                )))
            }
        };
        RecoveryId::from_byte(id)
            .ok_or_else(|| SdkError::InvalidCoupon(format!("unsupported recovery id {}", id)))
    }

    /// Recover the signing address for an already-built digest
    pub fn recover(&self, digest: &[u8; 32]) -> Result<Address> {
        let mut rs = [0u8; 64];
        rs[..32].copy_from_slice(&self.r);
        rs[32..].copy_from_slice(&self.s);

        let signature = Signature::from_slice(&rs)
            .map_err(|e| SdkError::InvalidCoupon(format!("malformed signature: {}", e)))?;

        // Only low-S signatures are canonical
        if signature.normalize_s().is_some() {
            return Err(SdkError::InvalidCoupon("non-canonical signature".into()));
        }

        let key = VerifyingKey::recover_from_prehash(digest, &signature, self.recovery_id()?)
            .map_err(|e| SdkError::InvalidCoupon(format!("recovery failed: {}", e)))?;

        Ok(Address::from_verifying_key(&key))
    }

    /// Recover the signer for the (class, quantity, address) this coupon claims to cover
    pub fn signer_for(
        &self,
        class: CouponClass,
        quantity: u64,
        address: &Address,
    ) -> Result<Address> {
        self.recover(&coupon_digest(class, quantity, address))
    }

    /// Ok only if the coupon was signed by `issuer` for exactly this triple
    pub fn verify(
        &self,
        class: CouponClass,
        quantity: u64,
        address: &Address,
        issuer: &Address,
    ) -> Result<()> {
        let signer = self.signer_for(class, quantity, address)?;
        if signer != *issuer {
            return Err(SdkError::InvalidCoupon(format!(
                "signed by {}, trusted issuer is {}",
                signer, issuer
            )));
        }
        Ok(())
    }
}

/// Holds the issuer private key
pub struct CouponSigner {
    key: SigningKey,
    address: Address,
}

impl CouponSigner {
    pub fn new(key: SigningKey) -> Self {
        let address = Address::from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    pub fn random() -> Self {
        Self::new(SigningKey::random(&mut rand::rngs::OsRng))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(SdkError::KeyLoadFailure(format!(
                "signing key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(bytes)
            .map_err(|e| SdkError::KeyLoadFailure(format!("invalid signing key: {}", e)))?;
        Ok(Self::new(key))
    }

    /// Hex with or without `0x`, surrounding whitespace ignored
    pub fn from_hex(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(body)
            .map_err(|e| SdkError::KeyLoadFailure(format!("signing key is not hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }

    /// Address the verifier must trust for these coupons
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Coupon> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|e| SdkError::KeyLoadFailure(format!("signing failed: {}", e)))?;

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(Coupon {
            r,
            s,
            v: recovery_id.to_byte() + V_OFFSET,
        })
    }

    pub fn sign(&self, class: CouponClass, quantity: u64, address: &Address) -> Result<Coupon> {
        self.sign_digest(&coupon_digest(class, quantity, address))
    }
}

mod hex_word {
    use super::*;

    pub fn serialize<S: Serializer>(word: &[u8; 32], s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(word)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let body = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(body).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}
