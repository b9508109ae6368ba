/// Alert registry: low-stock evaluation, sweep, acknowledgement
pub mod alert;
/// Kit checklist management for the owning patient
pub mod kit;
/// Patient onboarding and lookup by account
pub mod patient;
/// QR rendering of public kit URLs
pub mod qr;
/// Stock reconciler: the only writer of supply balances
pub mod stock;
/// Supply ledger store
pub mod supply;
/// Claimed-manifest diffing and the public token surface
pub mod verification;
