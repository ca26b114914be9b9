pub mod analytics;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod fleet;
pub mod lifecycle;
pub mod models;
pub mod random;
pub mod routes;
pub mod seed;
pub mod store;
