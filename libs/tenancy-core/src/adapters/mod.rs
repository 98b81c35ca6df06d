// Declare modules within the adapters directory
pub mod postgres_search_path;
