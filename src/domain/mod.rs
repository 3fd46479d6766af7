//! Domain layer - liquidity analysis, scoring, portfolio risk and alerts

pub mod alerts;
pub mod liquidity;
pub mod portfolio;
pub mod scoring;
