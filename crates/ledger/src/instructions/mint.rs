/// Coupon-gated mint. Checks run in order: quantity, payment, coupon, quota,
/// arithmetic. State is only written once all of them pass.
use tracing::{info, warn};

use coupon_sdk::{Coupon, CouponClass};

use crate::errors::{LedgerError, Result};
use crate::events::LedgerEvent;
use crate::{CallContext, Ledger};

#[derive(Clone, Copy, Debug)]
pub struct MintParams {
    pub class: CouponClass,
    /// Units to mint now
    pub requested: u64,
    /// Quantity the coupon was issued for
    pub allotted: u64,
    pub coupon: Coupon,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MintOutcome {
    pub first_token_id: u64,
    pub quantity: u64,
    /// Counter for (caller, class) after this mint
    pub class_total: u64,
}

pub fn handler(ledger: &mut Ledger, ctx: &CallContext, params: MintParams) -> Result<MintOutcome> {
    let result = validate_and_apply(ledger, ctx, params);
    if let Err(e) = &result {
        warn!("Mint rejected for {} ({}): {}", ctx.caller, params.class, e);
    }
    result
}

fn validate_and_apply(
    ledger: &mut Ledger,
    ctx: &CallContext,
    params: MintParams,
) -> Result<MintOutcome> {
    let MintParams {
        class,
        requested,
        allotted,
        coupon,
    } = params;

    if requested == 0 {
        return Err(LedgerError::ZeroQuantity);
    }

    // Non-payable classes refuse any attached value
    let expected = ledger
        .config
        .policy(class)
        .required_payment(requested)
        .ok_or(LedgerError::Overflow)?;
    if ctx.value != expected {
        return Err(LedgerError::IncorrectPayment {
            expected,
            paid: ctx.value,
        });
    }

    let signer = coupon
        .signer_for(class, allotted, &ctx.caller)
        .map_err(|e| LedgerError::InvalidCoupon(e.to_string()))?;
    if signer != ledger.config.issuer {
        return Err(LedgerError::InvalidCoupon(format!(
            "recovered signer {} is not the trusted issuer",
            signer
        )));
    }

    let minted = ledger.counters.get(&ctx.caller, class);
    let class_total = ledger
        .counters
        .checked_next(&ctx.caller, class, requested)
        .ok_or(LedgerError::Overflow)?;
    if class_total > allotted {
        return Err(LedgerError::QuotaExceeded {
            class,
            minted,
            requested,
            allotted,
        });
    }

    let first_token_id = ledger.tokens.total_supply();
    let update = ledger
        .tokens
        .plan_mint(ctx.caller, requested, ctx.value)
        .ok_or(LedgerError::Overflow)?;

    // Commit
    ledger.counters.set(ctx.caller, class, class_total);
    ledger.tokens.apply(update);
    ledger.events.push(LedgerEvent::Minted {
        to: ctx.caller,
        class,
        quantity: requested,
        first_token_id,
        class_total,
        paid: ctx.value,
    });

    info!(
        "Minted {} {} unit(s) to {} ({}/{} used)",
        requested, class, ctx.caller, class_total, allotted
    );

    Ok(MintOutcome {
        first_token_id,
        quantity: requested,
        class_total,
    })
}
