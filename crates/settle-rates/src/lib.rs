//! # settle-rates
//!
//! Exchange rate sources for USD → KRW conversion.
//!
//! This crate provides:
//! - [`RateSource`] - Async trait for anything that quotes a rate for a date
//! - [`SmbsClient`] - Seoul Money Brokerage standard rate page (default)
//! - [`KoreaEximClient`] - Korea Eximbank open API client (reqwest)
//! - [`FixedRateSource`] - A manually entered rate
//! - [`create_source`] - Build the configured [`RateProvider`]
//!
//! Requests are made once; there is no retry and no caching.

pub mod config;
pub mod error;
pub mod exim;
pub mod smbs;
pub mod source;

pub use config::{RateClientConfig, RateProvider};
pub use error::{RateError, Result};
pub use exim::KoreaEximClient;
pub use smbs::SmbsClient;
pub use source::{FixedRateSource, RateQuote, RateSource, create_source};
