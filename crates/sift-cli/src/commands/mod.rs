//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db, build_ai)
//! - `import` - CSV import command
//! - `categorize` - Batch categorization command and the shared run loop
//! - `review` - Review queue commands (list, apply, promote)
//! - `rules` - Rule management commands (list, add, delete, test)
//! - `learn` - Pattern learner command
//! - `status` - Status and taxonomy listing commands

pub mod categorize;
pub mod core;
pub mod import;
pub mod learn;
pub mod review;
pub mod rules;
pub mod status;

// Re-export command functions for main.rs
pub use categorize::*;
pub use core::*;
pub use import::*;
pub use learn::*;
pub use review::*;
pub use rules::*;
pub use status::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
