//! Domain types shared across all Catraca services.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import in `usecase/` and `domain/` layers; never in `infra/` or `handlers/`.

pub mod event_day;
pub mod payment;
pub mod status;
