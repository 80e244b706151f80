//! Directory-backed record store

use async_trait::async_trait;
use tracing::debug;

use crate::errors::AnalyzerError;
use crate::filesys::dir::Dir;
use crate::models::record::AnalysisRecord;
use crate::persist::store::{RecordStore, StoreAck};

/// Writes each record to `<dir>/<uuid>.json`, replacing earlier runs
pub struct FileRecordStore {
    dir: Dir,
}

impl FileRecordStore {
    pub fn new(dir: Dir) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Dir {
        &self.dir
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn store(&self, record: &AnalysisRecord) -> Result<StoreAck, AnalyzerError> {
        if record.uuid().is_empty() {
            return Err(AnalyzerError::PersistenceFailure(
                "record has no server uuid".to_string(),
            ));
        }

        let file = self.dir.file(&format!("{}.json", record.uuid()));
        file.write_json(record).await?;
        debug!("Wrote record to {:?}", file.path());

        Ok(StoreAck {
            uuid: record.uuid().to_string(),
            location: file.path().display().to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
