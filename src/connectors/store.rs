// src/connectors/store.rs
use crate::connectors::traits::BaselineStore;
use crate::error::{Result, WatchError};
use crate::types::BaselineMap;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

/// Baseline prices of one service as a pretty JSON object on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BaselineStore for JsonFileStore {
    async fn read(&self) -> Result<BaselineMap> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No saved prices yet, starting empty");
                return Ok(BaselineMap::new());
            }
            Err(e) => {
                return Err(WatchError::Persist(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )))
            }
        };

        if data.trim().is_empty() {
            return Ok(BaselineMap::new());
        }

        serde_json::from_str(&data).map_err(|e| {
            WatchError::Persist(format!("cannot decode {}: {e}", self.path.display()))
        })
    }

    async fn write(&self, baseline: &BaselineMap) -> Result<()> {
        let persist_err =
            |e: std::io::Error| WatchError::Persist(format!("cannot write {}: {e}", self.path.display()));

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(persist_err)?;
        }

        let data = serde_json::to_string_pretty(baseline)
            .map_err(|e| WatchError::Persist(format!("cannot encode prices: {e}")))?;

        // Write-then-rename so a crash never leaves a half-written file behind.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await.map_err(persist_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(persist_err)?;

        debug!(path = %self.path.display(), items = baseline.len(), "Prices saved");
        Ok(())
    }
}
