use tracing::{info, warn};

use coupon_sdk::Address;

use crate::errors::{LedgerError, Result};
use crate::events::LedgerEvent;
use crate::Ledger;

/// Replace the trusted issuer. Coupons from the previous key stop verifying
/// immediately; there is no overlap window.
pub fn handler(ledger: &mut Ledger, caller: &Address, new_issuer: Address) -> Result<()> {
    if *caller != ledger.config.admin {
        warn!("Rejected issuer rotation from non-admin {}", caller);
        return Err(LedgerError::Unauthorized);
    }

    let previous = ledger.config.issuer;
    ledger.config.issuer = new_issuer;
    ledger.events.push(LedgerEvent::IssuerKeyRotated {
        previous,
        new: new_issuer,
    });

    info!("Updated issuer key from {:?} to {:?}", previous, new_issuer);
    Ok(())
}
