pub mod cors;
pub mod error_envelope;
