//! adledger - webhook-driven conversion ledger with attribution fan-out
//!
//! This library records payment conversions delivered by Stripe webhooks
//! exactly once per upstream event, serves filtered reporting over the
//! ledger, and forwards conversion data to Meta Conversions API
//! destinations routed by campaign id.

pub mod attribution;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod extractors;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod pagination;
pub mod payments;
