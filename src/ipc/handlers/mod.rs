pub mod access;
pub mod auth;
pub mod core;
pub mod policy;
