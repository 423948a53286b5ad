pub mod auth;
pub mod change_log;
pub mod delivery;
pub mod file;
pub mod roles;
pub mod school;
pub mod vendor;
