// crates/stillvo-config/src/lib.rs
// ============================================================================
// Module: Stillvo Config Library
// Description: Public API surface for Stillvo configuration.
// Purpose: Expose the canonical configuration model and validation.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! Stillvo configuration is loaded from a TOML file with strict size limits
//! and fail-closed parsing. Secrets may be supplied through environment
//! variables, which take precedence over file values.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::MailConfig;
pub use config::ServerConfig;
pub use config::StillvoConfig;
pub use config::StoreConfig;
