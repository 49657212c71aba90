use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct StorageManager;

impl StorageManager {
    /// `<export_dir>/YYYY/MM/DD/<run_id>.parquet`
    pub fn generate_export_path(export_dir: &Path, run_id: &Uuid, at: DateTime<Utc>) -> PathBuf {
        export_dir
            .join(at.format("%Y/%m/%d").to_string())
            .join(format!("{}.parquet", run_id))
    }
}
