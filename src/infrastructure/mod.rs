//! Market data collaborators feeding the analysis passes

pub mod data_source;
pub mod demo_source;
pub mod snapshot_file;

pub use data_source::{MarketDataSource, MarketSnapshot};
pub use demo_source::DemoDataSource;
pub use snapshot_file::SnapshotFileSource;
