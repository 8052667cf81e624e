//! Unit tests for configuration loading and resolution.
//!
//! Tests are organised into modules by functional area:
//! - `helpers`: Shared test utilities
//! - `precedence`: Layer precedence tests
//! - `field_resolution`: Token, repository list, and lookback resolution
//! - `settings`: Warehouse target and run settings validation

mod helpers;
mod settings;
