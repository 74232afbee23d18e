pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod export;
pub mod fake_data;
pub mod fpl_api;
pub mod history;
pub mod http_cache;
pub mod http_client;
pub mod lookup;
pub mod persist;
pub mod ranking;
pub mod report;
pub mod score;
pub mod squad;
pub mod transfer;
