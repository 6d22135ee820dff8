/// Persisted session and score records.
pub mod models;
/// Quiz persistence contract and its implementations.
pub mod quiz_store;
/// Storage abstraction layer for database operations.
pub mod storage;
