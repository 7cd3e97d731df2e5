pub mod compare;
pub mod engine;
pub mod error;
pub mod http;
pub mod results;
pub mod suite;

pub use error::RbenchError;
