pub mod agent;
pub mod blob;
pub mod chat;
pub mod config;
pub mod errors;
pub mod foundry;
pub mod logging;
pub mod routes;
pub mod search;
pub mod state;
