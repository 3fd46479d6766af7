//! Distress-scale normalization of TVL series

use super::FlowWindow;
use crate::math::MAX_SCORE;
use crate::shared::errors::{AnalysisError, AnalysisResult};

/// Value assigned to every point of a flat series
const FLAT_SERIES_VALUE: f64 = 50.0;

/// Rescales TVL series to 0-100 where 100 is the deepest point of the window
pub struct SeriesNormalizer;

impl SeriesNormalizer {
    pub fn normalize(window: &FlowWindow) -> AnalysisResult<Vec<f64>> {
        let values: Vec<f64> = window.tvl_values().collect();
        Self::normalize_values(&values)
    }

    pub fn normalize_values(values: &[f64]) -> AnalysisResult<Vec<f64>> {
        if values.is_empty() {
            return Err(AnalysisError::InvalidInput("cannot normalize an empty series".to_string()));
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;

        if range <= 0.0 {
            return Ok(vec![FLAT_SERIES_VALUE; values.len()]);
        }

        Ok(values
            .iter()
            .map(|v| MAX_SCORE - (v - min) / range * MAX_SCORE)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::liquidity::TvlPoint;

    #[test]
    fn test_declining_series_trends_to_100() {
        let values = [1000.0, 750.0, 500.0];
        let normalized = SeriesNormalizer::normalize_values(&values).unwrap();
        assert_eq!(normalized, vec![0.0, 50.0, 100.0]);
    }

    #[test]
    fn test_flat_series_maps_to_50() {
        let window = FlowWindow::new(
            "flat",
            (0..5).map(|i| TvlPoint::new(i * 60, 42.0)).collect(),
        )
        .unwrap();
        let normalized = SeriesNormalizer::normalize(&window).unwrap();
        assert!(normalized.iter().all(|&v| v == 50.0));
    }

    #[test]
    fn test_values_stay_bounded() {
        let values = [3.0, 1e9, 0.0, 17.5, 2.5e8, 999.0];
        let normalized = SeriesNormalizer::normalize_values(&values).unwrap();
        assert!(normalized.iter().all(|v| (0.0..=100.0).contains(v)));
        assert_eq!(normalized[1], 0.0);
        assert_eq!(normalized[2], 100.0);
    }

    #[test]
    fn test_empty_series_is_invalid() {
        assert!(matches!(
            SeriesNormalizer::normalize_values(&[]),
            Err(AnalysisError::InvalidInput(_))
        ));
    }
}
