//! JSON snapshot file as a market data source. The file is re-read on every
//! request so an external collector can refresh it between passes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::data_source::{MarketDataSource, MarketSnapshot};
use crate::domain::liquidity::TvlPoint;
use crate::shared::errors::DataSourceError;
use crate::shared::types::{ExposureRecord, FlowBaseline, ProtocolRecord, ReputationRecord};

#[derive(Debug, Clone)]
pub struct SnapshotFileSource {
    path: PathBuf,
    name: String,
}

impl SnapshotFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("snapshot:{}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<MarketSnapshot, DataSourceError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let snapshot: MarketSnapshot =
            serde_json::from_str(&raw).map_err(|e| DataSourceError::Malformed(format!("{}: {}", self.path.display(), e)))?;
        debug!("Loaded {} protocols from {}", snapshot.protocols.len(), self.path.display());
        Ok(snapshot)
    }

    /// Write a snapshot in the format `load` reads
    pub async fn save(&self, snapshot: &MarketSnapshot) -> Result<(), DataSourceError> {
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| DataSourceError::Malformed(e.to_string()))?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl MarketDataSource for SnapshotFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn protocols(&self) -> Result<Vec<ProtocolRecord>, DataSourceError> {
        Ok(self.load().await?.protocols)
    }

    async fn tvl_history(&self, address: &str) -> Result<Vec<TvlPoint>, DataSourceError> {
        self.load()
            .await?
            .history(address)
            .map(<[TvlPoint]>::to_vec)
            .ok_or_else(|| DataSourceError::ProtocolNotFound(format!("tvl history of {}", address)))
    }

    async fn flow_baseline(&self, address: &str) -> Result<Option<FlowBaseline>, DataSourceError> {
        Ok(self.load().await?.baseline(address).copied())
    }

    async fn reputation(&self, address: &str) -> Result<Option<ReputationRecord>, DataSourceError> {
        Ok(self.load().await?.reputation(address).cloned())
    }

    async fn user_exposures(&self, user: &str) -> Result<Vec<ExposureRecord>, DataSourceError> {
        Ok(self
            .load()
            .await?
            .user_exposures(user)
            .map(<[ExposureRecord]>::to_vec)
            .unwrap_or_default())
    }

    /// One read per snapshot keeps every piece of a pass consistent
    async fn snapshot(&self, user: Option<&str>) -> Result<MarketSnapshot, DataSourceError> {
        let mut snapshot = self.load().await?;
        if let Some(user) = user {
            snapshot.exposures.retain(|k, _| k.eq_ignore_ascii_case(user));
        }
        Ok(snapshot)
    }
}
