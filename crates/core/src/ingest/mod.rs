pub mod auth;
pub mod ga4;
pub mod provider;
pub mod types;
