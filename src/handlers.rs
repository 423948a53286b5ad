// src/handlers.rs

pub mod auth;
pub mod deliveries;
pub mod orders;
pub mod schools;
pub mod users;
pub mod vendors;
