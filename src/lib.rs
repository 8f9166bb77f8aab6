pub mod api;
pub mod config;
pub mod ledger;
pub mod observability;
pub mod provider;
pub mod storage;
pub mod tasks;
