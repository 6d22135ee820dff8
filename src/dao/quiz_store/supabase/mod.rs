mod config;
mod error;
mod models;
mod store;

pub use config::SupabaseConfig;
pub use store::SupabaseQuizStore;
