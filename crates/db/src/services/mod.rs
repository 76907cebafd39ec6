pub mod account;
pub mod email;
pub mod error;
pub mod generator;
pub mod retention;
