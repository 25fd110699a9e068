/// One issuance run: allowlist in, coupon file plus pin out.
/// Everything that can fail for the whole batch (key, allowlist) is checked
/// before the output location is touched.
use coupon_sdk::issuance::{parse_allowlist, pin_bytes};
use coupon_sdk::{issue, Allowlist, CouponClass, CouponSigner, IssuanceSet};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{IssuerError, Result};

pub struct BatchSummary {
    pub output: PathBuf,
    pub pin: String,
    pub issued: usize,
    pub skipped: Vec<String>,
}

/// `<out_dir>/<class>Coupons.json`
pub fn output_path(out_dir: &Path, class: CouponClass) -> PathBuf {
    out_dir.join(format!("{}Coupons.json", class))
}

pub fn pin_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

pub fn load_allowlist(path: &Path) -> Result<Allowlist> {
    let bytes = std::fs::read(path).map_err(|e| IssuerError::AllowlistLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_allowlist(&bytes).map_err(|e| IssuerError::AllowlistLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Drop the previous output for this class; every run replaces the whole set
fn prepare_output(out_dir: &Path, class: CouponClass) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;
    let output = output_path(out_dir, class);
    for path in [pin_path(&output), output] {
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

pub fn write_issuance(
    out_dir: &Path,
    class: CouponClass,
    set: &IssuanceSet,
) -> Result<(PathBuf, String)> {
    let bytes = set.to_json()?;
    let pin = pin_bytes(&bytes);

    prepare_output(out_dir, class)?;

    let output = output_path(out_dir, class);
    let staging = output.with_extension("json.tmp");
    std::fs::write(&staging, &bytes)?;
    std::fs::rename(&staging, &output)?;
    std::fs::write(pin_path(&output), format!("{}\n", pin))?;

    Ok((output, pin))
}

/// Read a class's output back, checking it against its pin when one exists
pub fn read_issuance(
    out_dir: &Path,
    class: CouponClass,
) -> Result<Option<(IssuanceSet, Vec<u8>, String)>> {
    let output = output_path(out_dir, class);
    if !output.exists() {
        return Ok(None);
    }

    let bytes = std::fs::read(&output)?;
    let pin_file = pin_path(&output);
    let set = if pin_file.exists() {
        let expected = std::fs::read_to_string(&pin_file)?;
        IssuanceSet::from_pinned_json(&bytes, &expected)?
    } else {
        IssuanceSet::from_json(&bytes)?
    };
    let pin = pin_bytes(&bytes);

    Ok(Some((set, bytes, pin)))
}

pub fn run(
    signer: &CouponSigner,
    class: CouponClass,
    allowlist_path: &Path,
    out_dir: &Path,
) -> Result<BatchSummary> {
    let allowlist = load_allowlist(allowlist_path)?;
    info!(
        "Loaded {} allowlist entries from {}",
        allowlist.len(),
        allowlist_path.display()
    );

    let report = issue(signer, class, &allowlist)?;
    let (output, pin) = write_issuance(out_dir, class, &report.set)?;

    info!("Wrote {} (sha256 {})", output.display(), pin);

    Ok(BatchSummary {
        output,
        pin,
        issued: report.set.len(),
        skipped: report.skipped,
    })
}
