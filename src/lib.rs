pub mod config;
pub mod error;
pub mod extract;
pub mod intake;
pub mod models;
pub mod routes;
pub mod state;
pub mod storage;
pub mod store;
