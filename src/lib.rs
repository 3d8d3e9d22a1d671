//! Stale-while-revalidate request caching and bounded notification popups for
//! line-of-business dashboards.

pub mod cache;
pub mod config;
pub mod error;
pub mod infra;
pub mod notify;
pub mod transport;
pub mod util;
