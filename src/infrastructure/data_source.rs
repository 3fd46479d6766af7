//! Market data source interface

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::domain::liquidity::TvlPoint;
use crate::shared::errors::DataSourceError;
use crate::shared::types::{ExposureRecord, FlowBaseline, ProtocolRecord, ReputationRecord};

/// Everything one analysis pass reads, captured at a single point in time.
/// Maps are keyed by protocol address (or user id for exposures).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketSnapshot {
    /// Unix seconds the data describes; passes fall back to the wall clock when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<i64>,
    pub protocols: Vec<ProtocolRecord>,
    pub histories: BTreeMap<String, Vec<TvlPoint>>,
    pub baselines: BTreeMap<String, FlowBaseline>,
    pub reputations: BTreeMap<String, ReputationRecord>,
    pub exposures: BTreeMap<String, Vec<ExposureRecord>>,
}

impl MarketSnapshot {
    pub fn history(&self, address: &str) -> Option<&[TvlPoint]> {
        lookup(&self.histories, address).map(Vec::as_slice)
    }

    pub fn baseline(&self, address: &str) -> Option<&FlowBaseline> {
        lookup(&self.baselines, address)
    }

    pub fn reputation(&self, address: &str) -> Option<&ReputationRecord> {
        lookup(&self.reputations, address)
    }

    pub fn user_exposures(&self, user: &str) -> Option<&[ExposureRecord]> {
        lookup(&self.exposures, user).map(Vec::as_slice)
    }
}

/// Exact key first, then a case-insensitive match
fn lookup<'a, T>(map: &'a BTreeMap<String, T>, key: &str) -> Option<&'a T> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// Supplier of protocol records, TVL histories, baselines, reputations and
/// user holdings.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &str;

    async fn protocols(&self) -> Result<Vec<ProtocolRecord>, DataSourceError>;

    async fn tvl_history(&self, address: &str) -> Result<Vec<TvlPoint>, DataSourceError>;

    async fn flow_baseline(&self, address: &str) -> Result<Option<FlowBaseline>, DataSourceError>;

    async fn reputation(&self, address: &str) -> Result<Option<ReputationRecord>, DataSourceError>;

    async fn user_exposures(&self, user: &str) -> Result<Vec<ExposureRecord>, DataSourceError>;

    /// Gather one consistent snapshot. Missing per-protocol data is skipped
    /// with a warning; any other failure aborts the snapshot.
    async fn snapshot(&self, user: Option<&str>) -> Result<MarketSnapshot, DataSourceError> {
        let protocols = self.protocols().await?;

        let fetches = protocols.iter().map(|p| async move {
            let history = self.tvl_history(&p.address).await;
            let baseline = self.flow_baseline(&p.address).await;
            let reputation = self.reputation(&p.address).await;
            (p.address.clone(), history, baseline, reputation)
        });

        let mut snapshot = MarketSnapshot::default();
        for (address, history, baseline, reputation) in join_all(fetches).await {
            if let Some(points) = skip_missing(&address, history)? {
                snapshot.histories.insert(address.clone(), points);
            }
            if let Some(Some(b)) = skip_missing(&address, baseline)? {
                snapshot.baselines.insert(address.clone(), b);
            }
            if let Some(Some(r)) = skip_missing(&address, reputation)? {
                snapshot.reputations.insert(address.clone(), r);
            }
        }

        if let Some(user) = user {
            let holdings = self.user_exposures(user).await?;
            snapshot.exposures.insert(user.to_string(), holdings);
        }

        debug!(
            "{}: snapshot of {} protocols, {} histories",
            self.name(),
            protocols.len(),
            snapshot.histories.len()
        );
        snapshot.protocols = protocols;
        Ok(snapshot)
    }
}

fn skip_missing<T>(address: &str, result: Result<T, DataSourceError>) -> Result<Option<T>, DataSourceError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DataSourceError::ProtocolNotFound(what)) => {
            warn!("No data for {}: {}", address, what);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
