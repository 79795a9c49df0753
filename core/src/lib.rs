//! kudos-core: activity points & gamification ledger.
//!
//! Feature services credit users through `engine::PointsEngine`; the
//! ledger is the source of truth and accounts are a cached projection.

pub mod account;
pub mod award_engine;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod ledger;
pub mod level;
pub mod member;
pub mod reconciliation;
pub mod retry;
pub mod store;
pub mod streak_tracker;
pub mod summary_service;
pub mod types;
