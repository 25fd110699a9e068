pub mod mint;
pub mod set_issuer_key;
