//! Election and vote lifecycle engine for a data access governance
//! portal: opens review cycles for data access requests, records votes
//! and the closure they trigger, and keeps ballots staffed through
//! committee role changes.

pub mod config;
pub mod db;
pub mod directory;
pub mod engine;
pub mod errors;
pub mod models;
