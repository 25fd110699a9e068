/// Loads the issuer private key. Nothing is generated implicitly: a missing or
/// malformed key stops the run before any coupon is written.
use coupon_sdk::CouponSigner;
use std::path::Path;
use tracing::info;

use crate::config::IssuerConfig;
use crate::error::{IssuerError, Result};

pub fn load_signer(config: &IssuerConfig) -> Result<CouponSigner> {
    if let Some(hex_key) = &config.signing_key {
        let signer = CouponSigner::from_hex(hex_key)?;
        info!(
            "Loaded signing key from COUPON_SIGNING_KEY (issuer {})",
            signer.address().to_checksum()
        );
        return Ok(signer);
    }

    let path = config.key_path.as_ref().ok_or_else(|| {
        IssuerError::KeyLoadFailure("set COUPON_SIGNING_KEY or COUPON_KEY_PATH".into())
    })?;
    load_from_file(path)
}

fn load_from_file(path: &Path) -> Result<CouponSigner> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        IssuerError::KeyLoadFailure(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let signer = CouponSigner::from_hex(&contents)?;
    info!(
        "Loaded signing key from {} (issuer {})",
        path.display(),
        signer.address().to_checksum()
    );
    Ok(signer)
}

/// Generate a fresh key and write it as hex. Never overwrites an existing file.
pub fn generate_key_file(path: &Path) -> Result<CouponSigner> {
    if path.exists() {
        return Err(IssuerError::KeyLoadFailure(format!(
            "{} already exists, refusing to overwrite",
            path.display()
        )));
    }

    let signer = CouponSigner::random();
    std::fs::write(path, format!("{}\n", signer.to_hex()))?;
    info!(
        "Wrote new signing key to {} (issuer {})",
        path.display(),
        signer.address().to_checksum()
    );
    Ok(signer)
}
