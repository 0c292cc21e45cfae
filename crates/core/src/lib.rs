//! Core business logic for studyhub.

pub mod services;

pub use services::*;
