//! API Routes
//!
//! Route handlers organized by functionality.

pub mod analysis;
pub mod entries;
pub mod export;
pub mod health;
pub mod sync;
