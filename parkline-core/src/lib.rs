pub mod error;
pub mod gateway;
pub mod intent;
pub mod lifecycle;
pub mod models;
pub mod repository;

pub use error::EngineError;

pub type EngineResult<T> = Result<T, EngineError>;
