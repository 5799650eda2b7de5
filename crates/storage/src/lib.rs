#![forbid(unsafe_code)]

pub mod forest_repo;
pub mod records;
pub mod repository;
pub mod sqlite;

pub use forest_repo::ForestRepository;
pub use repository::{InMemoryKeyValueStore, KeyValueStore, Storage, StorageError};
