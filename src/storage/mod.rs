pub mod json_store;
pub mod parquet_export;
pub mod storage_manager;

pub use json_store::*;
pub use parquet_export::*;
pub use storage_manager::StorageManager;
