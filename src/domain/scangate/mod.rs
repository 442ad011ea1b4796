pub mod finding;
pub mod gate_verdict;
pub mod ignore_policy;
pub mod image_identity;
pub mod image_reference;
pub mod invariant_violation;
pub mod severity;
