//! Library surface for `dead-drop-client`: the protocol driver, key
//! generation, and config file loading, split from `main.rs` so
//! `tests/integration_test.rs` can exercise them without going through
//! the CLI argument parser.

pub mod config;
pub mod driver;
pub mod keygen;
