//! Application layer - use cases and services

pub mod commands;
pub mod monitor;
pub mod scheduler;
pub mod services;

pub use commands::{Cli, CommandExecutor, Commands};
pub use monitor::{MonitorConfig, MonitorStats, SentinelMonitor};
pub use scheduler::{ScheduleHandle, Scheduler, TokioScheduler};
pub use services::{MonitoringReport, ProtocolAnalysis, ProtocolInput, SentinelService};
