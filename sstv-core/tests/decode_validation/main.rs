//! Decode validation suite
//!
//! Component and controller behaviour beyond the acceptance scenarios:
//! synthesised end-to-end decodes, streaming equivalences, sync-loss
//! policies, and property checks.

mod end_to_end;
mod fixtures;
mod properties;
mod streaming;
