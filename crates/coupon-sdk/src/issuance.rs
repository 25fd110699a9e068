/// Turns an operator allowlist into a signed coupon set.
/// Keys of the set are lowercase addresses; each entry pairs the allotted
/// quantity with the coupon that attests to it.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::address::Address;
use crate::class::CouponClass;
use crate::coupon::{Coupon, CouponSigner};
use crate::crypto::sha256;
use crate::error::{Result, SdkError};

/// Raw allowlist: address string -> allotted quantity
pub type Allowlist = BTreeMap<String, u64>;

pub fn parse_allowlist(bytes: &[u8]) -> Result<Allowlist> {
    serde_json::from_slice(bytes).map_err(|e| {
        SdkError::Serialization(format!("allowlist must map addresses to quantities: {}", e))
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponEntry {
    #[serde(alias = "qty")]
    pub quantity: u64,
    pub coupon: Coupon,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuanceSet {
    entries: BTreeMap<String, CouponEntry>,
}

impl IssuanceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: &Address, entry: CouponEntry) {
        self.entries.insert(address.to_lower_hex(), entry);
    }

    pub fn lookup(&self, address: &Address) -> Option<&CouponEntry> {
        self.entries.get(&address.to_lower_hex())
    }

    /// Lookup by raw string, normalised to lowercase first
    pub fn lookup_str(&self, address: &str) -> Option<&CouponEntry> {
        self.entries.get(&address.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CouponEntry)> {
        self.entries.iter()
    }

    /// Canonical on-disk form
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// sha256 of the canonical JSON, hex encoded
    pub fn pin(&self) -> Result<String> {
        Ok(pin_bytes(&self.to_json()?))
    }

    /// Parse a set fetched over an untrusted channel, refusing it unless its
    /// bytes hash to `expected_pin`
    pub fn from_pinned_json(bytes: &[u8], expected_pin: &str) -> Result<Self> {
        let actual = pin_bytes(bytes);
        if !actual.eq_ignore_ascii_case(expected_pin.trim()) {
            return Err(SdkError::IntegrityMismatch {
                expected: expected_pin.trim().to_string(),
                actual,
            });
        }
        Self::from_json(bytes)
    }

    /// Entries whose coupon does not recover to `issuer` for their own key
    pub fn unverifiable(&self, class: CouponClass, issuer: &Address) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(address, entry)| {
                let verified = address.parse::<Address>().and_then(|a| {
                    entry.coupon.verify(class, entry.quantity, &a, issuer)
                });
                verified.is_err()
            })
            .map(|(address, _)| address.clone())
            .collect()
    }
}

pub fn pin_bytes(bytes: &[u8]) -> String {
    hex::encode(sha256(bytes))
}

pub struct IssuanceReport {
    pub set: IssuanceSet,
    /// Allowlist keys that were not valid addresses
    pub skipped: Vec<String>,
}

/// Sign one coupon per well-formed allowlist entry.
/// Malformed addresses are reported and skipped; they never abort the batch.
pub fn issue(
    signer: &CouponSigner,
    class: CouponClass,
    allowlist: &Allowlist,
) -> Result<IssuanceReport> {
    let mut set = IssuanceSet::new();
    let mut skipped = Vec::new();

    for (raw, &quantity) in allowlist {
        let address = match raw.trim().parse::<Address>() {
            Ok(address) => address,
            Err(e) => {
                warn!("{}: Invalid Address ({})", raw, e);
                skipped.push(raw.clone());
                continue;
            }
        };

        if set.lookup(&address).is_some() {
            warn!("{}: duplicate allowlist entry, keeping the first", raw);
            skipped.push(raw.clone());
            continue;
        }

        let coupon = signer.sign(class, quantity, &address)?;
        set.insert(&address, CouponEntry { quantity, coupon });
    }

    info!(
        "Issued {} {} coupon(s) signed by {} ({} skipped)",
        set.len(),
        class,
        signer.address().to_checksum(),
        skipped.len()
    );

    Ok(IssuanceReport { set, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn allowlist() -> Allowlist {
        let mut list = Allowlist::new();
        list.insert("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".into(), 3);
        list.insert("0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359".into(), 10);
        list.insert("0xnotanaddress".into(), 1);
        list.insert("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".into(), 4);
        list
    }

    #[test]
    fn test_issue_skips_malformed() {
        let signer = CouponSigner::from_hex(KEY_HEX).unwrap();
        let report = issue(&signer, CouponClass::Presale, &allowlist()).unwrap();

        assert_eq!(report.set.len(), 2);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.contains(&"0xnotanaddress".to_string()));

        let entry = report
            .set
            .lookup_str("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED")
            .unwrap();
        assert_eq!(entry.quantity, 3);
        assert!(report.set.unverifiable(CouponClass::Presale, &signer.address()).is_empty());
    }

    #[test]
    fn test_issue_is_idempotent() {
        let signer = CouponSigner::from_hex(KEY_HEX).unwrap();
        let first = issue(&signer, CouponClass::Team, &allowlist()).unwrap();
        let second = issue(&signer, CouponClass::Team, &allowlist()).unwrap();

        assert_eq!(first.set, second.set);
        assert_eq!(first.set.to_json().unwrap(), second.set.to_json().unwrap());
    }

    #[test]
    fn test_json_uses_lowercase_keys() {
        let signer = CouponSigner::from_hex(KEY_HEX).unwrap();
        let report = issue(&signer, CouponClass::Presale, &allowlist()).unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&report.set.to_json().unwrap()).unwrap();

        let entry = &value["0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"];
        assert_eq!(entry["quantity"], 3);
        assert!(entry["coupon"]["r"].is_string());
        assert!(entry["coupon"]["v"].is_u64());
    }

    #[test]
    fn test_pinned_load() {
        let signer = CouponSigner::from_hex(KEY_HEX).unwrap();
        let set = issue(&signer, CouponClass::Presale, &allowlist()).unwrap().set;
        let bytes = set.to_json().unwrap();
        let pin = set.pin().unwrap();

        assert_eq!(IssuanceSet::from_pinned_json(&bytes, &pin).unwrap(), set);

        let mut tampered = bytes.clone();
        let pos = tampered.iter().position(|&b| b == b'3').unwrap();
        tampered[pos] = b'9';
        assert!(matches!(
            IssuanceSet::from_pinned_json(&tampered, &pin),
            Err(SdkError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn test_unverifiable_detects_foreign_issuer() {
        let signer = CouponSigner::from_hex(KEY_HEX).unwrap();
        let other = CouponSigner::random();
        let set = issue(&signer, CouponClass::Presale, &allowlist()).unwrap().set;

        assert_eq!(set.unverifiable(CouponClass::Presale, &other.address()).len(), 2);
        assert_eq!(set.unverifiable(CouponClass::Team, &signer.address()).len(), 2);
    }

    #[test]
    fn test_parse_allowlist_rejects_bad_shapes() {
        assert!(parse_allowlist(br#"{"0xabc": 1}"#).is_ok());
        assert!(parse_allowlist(br#"{"0xabc": -1}"#).is_err());
        assert!(parse_allowlist(br#"["0xabc"]"#).is_err());
        assert!(parse_allowlist(b"not json").is_err());
    }
}
