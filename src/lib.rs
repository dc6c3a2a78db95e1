// Cachette offline asset cache library

pub mod classify;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod logging;
pub mod manager;
pub mod request;
pub mod store;
