pub mod auth;
pub mod batch;
pub mod history;
pub mod jwt;
pub mod normalizer;
