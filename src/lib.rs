pub mod app;
pub mod completion;
pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod migrator;
pub mod models;
pub mod order_number;
pub mod payments;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
