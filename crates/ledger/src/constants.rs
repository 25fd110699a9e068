use coupon_sdk::class::PRESALE_PRICE_WEI;

/// Wei per presale unit
pub const PRESALE_PRICE: u128 = PRESALE_PRICE_WEI;
