// src/services.rs

pub mod audit;
pub mod auth;
pub mod delivery_service;
pub mod order_service;
pub mod school_service;
pub mod token;
pub mod user_service;
pub mod vendor_service;
