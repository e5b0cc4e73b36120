pub mod claim;
pub mod user;
