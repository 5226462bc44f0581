//! Crowdfunding campaign tracker.
//!
//! Users open fundraising collects, other users donate against them, and the running
//! total of every collect is kept in step with its payments. Authors and donators are
//! notified by email when collects open, donations arrive and targets are met.

pub mod campaigns;
pub mod config;
pub mod error;
pub mod telemetry;
