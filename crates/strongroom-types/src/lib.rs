//! Strongroom Types - Canonical domain types for the custody vault
//!
//! This crate contains all foundational types for Strongroom with zero
//! dependencies on other strongroom crates. It defines the complete type
//! system for:
//!
//! - Identity types (`Address`, `TokenId`)
//! - Checked amount arithmetic (`Amount`)
//! - Custody records (credits, recipient bindings, batch deposit items)
//! - The full error taxonomy (`VaultError`)
//!
//! # Architectural Invariants
//!
//! These types support the core custody invariants:
//!
//! 1. A credit is created only by the relay's deposit path
//! 2. Every entry point is parameterized by the calling principal
//! 3. Failure must be explicit - no call silently succeeds with wrong state

pub mod amount;
pub mod custody;
pub mod error;
pub mod identity;

pub use amount::*;
pub use custody::*;
pub use error::*;
pub use identity::*;
