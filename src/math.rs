// src/math.rs

/// Upper bound of every score in the system
pub const MAX_SCORE: f64 = 100.0;

/// Percentage change from `initial` to `current`, 0 when `initial` is zero
pub fn calculate_percentage_change(initial: f64, current: f64) -> f64 {
    if initial == 0.0 {
        return 0.0;
    }
    (current - initial) / initial * 100.0
}

/// Nearest-index mapping used to resample a series of `len` points onto `target_len` points
pub fn resample_index(i: usize, len: usize, target_len: usize) -> usize {
    if target_len == 0 {
        return 0;
    }
    let idx = (i as f64 * (len as f64 / target_len as f64)).floor() as usize;
    idx.min(len.saturating_sub(1))
}

/// Squared Euclidean distance between two series resampled to their common length.
/// Returns the distance together with that length.
pub fn resampled_squared_distance(p: &[f64], q: &[f64]) -> (f64, usize) {
    let common = p.len().min(q.len());
    let distance = (0..common)
        .map(|i| {
            let diff = p[resample_index(i, p.len(), common)] - q[resample_index(i, q.len(), common)];
            diff * diff
        })
        .sum();
    (distance, common)
}

/// Convert a squared distance over `len` points of a 0-100 scale into a 0-100 similarity
pub fn distance_to_similarity(squared_distance: f64, len: usize) -> f64 {
    if len == 0 {
        return 0.0;
    }
    let max_distance = MAX_SCORE * MAX_SCORE * len as f64;
    (MAX_SCORE - squared_distance.sqrt() / max_distance.sqrt() * MAX_SCORE).max(0.0)
}

/// Clamp a score into [0, 100]
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, MAX_SCORE)
}

/// Sum of `score * weight` over the pairs, in order
pub fn weighted_sum(pairs: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    pairs.into_iter().fold(0.0, |acc, (score, weight)| acc + score * weight)
}

/// Amount-weighted mean of the values, 0 when the total weight is zero
pub fn weighted_mean(pairs: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    let (total, weight) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(total, weight), (value, w)| (total + value * w, weight + w));
    if weight > 0.0 {
        total / weight
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_percentage_change() {
        assert_eq!(calculate_percentage_change(1000.0, 800.0), -20.0);
        assert_eq!(calculate_percentage_change(200.0, 250.0), 25.0);
        assert_eq!(calculate_percentage_change(0.0, 500.0), 0.0);
    }

    #[test]
    fn test_resample_index() {
        // 40 points onto 20 takes every other point
        assert_eq!(resample_index(0, 40, 20), 0);
        assert_eq!(resample_index(1, 40, 20), 2);
        assert_eq!(resample_index(19, 40, 20), 38);
        // identity when lengths match
        assert_eq!(resample_index(7, 20, 20), 7);
    }

    #[test]
    fn test_distance_and_similarity() {
        let p = [0.0, 50.0, 100.0];
        let (distance, len) = resampled_squared_distance(&p, &p);
        assert_eq!(distance, 0.0);
        assert_eq!(len, 3);
        assert_eq!(distance_to_similarity(distance, len), 100.0);

        // maximally distant series
        let q = [100.0, 100.0];
        let r = [0.0, 0.0];
        let (distance, len) = resampled_squared_distance(&q, &r);
        assert_eq!(distance, 20_000.0);
        assert_eq!(distance_to_similarity(distance, len), 0.0);
    }

    #[test]
    fn test_weighted_helpers() {
        let sum = weighted_sum([(80.0, 0.3), (60.0, 0.25), (90.0, 0.25), (40.0, 0.2)]);
        assert_eq!(sum.round(), 70.0);
        assert_eq!(weighted_mean([(90.0, 100.0), (30.0, 300.0)]), 45.0);
        assert_eq!(weighted_mean(Vec::<(f64, f64)>::new()), 0.0);
        assert_eq!(clamp_score(-4.0), 0.0);
        assert_eq!(clamp_score(140.0), 100.0);
    }
}
