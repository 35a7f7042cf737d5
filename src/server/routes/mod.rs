pub mod account;
pub mod admin;
pub mod challenge;
pub mod practice;
pub mod progress;
