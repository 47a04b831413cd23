//! HTTP request handlers

pub mod object;
pub mod service;

pub use object::*;
pub use service::*;
