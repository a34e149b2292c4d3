pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod expiry;
pub mod handlers;
pub mod models;
