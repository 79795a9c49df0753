//! Shared primitive types used across the entire ledger.

/// The platform's user identifier. Opaque to this crate.
pub type UserId = String;

/// A ledger entry identifier (UUID v4, hyphenated).
pub type EntryId = String;

/// Whole points. Signed so it maps straight onto SQLite INTEGER.
pub type Points = i64;
