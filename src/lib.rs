pub mod cache;
pub mod config;
pub mod departures;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod persist;
pub mod pipeline;
pub mod row;
