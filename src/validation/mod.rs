pub mod classify;
pub mod evaluator;
pub mod mrz;
pub mod profile;

pub use classify::classify;
pub use evaluator::{evaluate, expiry_finding};
pub use profile::{photo_profile, scan_profile, Check, ComplianceProfile, Rule};
