//! Farthest-point sampling per batch group.

use rand::{Rng, RngCore};

use crate::error::{EdfCoreError, Result};
use crate::spatial::segments::BatchSegments;
use crate::types::Point3;

/// How the first sample of each batch group is chosen.
pub enum SamplingStart<'a> {
    /// Always the first point of the group.
    First,
    /// A uniformly random point of the group.
    Random(&'a mut dyn RngCore),
}

/// Number of samples drawn from a group of `count` points at `ratio`.
///
/// `max(1, ceil(ratio * count))`, capped at `count`. The product is taken in
/// `f32` so that `0.1 * 30` rounds to exactly 3.
#[inline]
pub fn sample_count(count: usize, ratio: f32) -> usize {
    if count == 0 {
        return 0;
    }
    let exact = ratio * count as f32;
    (exact.ceil() as usize).clamp(1, count)
}

/// Indices of the farthest-point samples, group by group in selection order.
pub fn farthest_point_sampling(
    points: &[Point3],
    batch: &[i64],
    ratio: f32,
    mut start: SamplingStart<'_>,
) -> Result<Vec<usize>> {
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(EdfCoreError::InvalidRatio { ratio });
    }
    if points.len() != batch.len() {
        return Err(EdfCoreError::LengthMismatch {
            what: "batch",
            expected: points.len(),
            got: batch.len(),
        });
    }

    let groups = BatchSegments::from_batch(batch)?;
    let mut selected = Vec::new();
    let mut min_dist: Vec<f32> = Vec::new();

    for (_, range) in groups.groups() {
        let group = &points[range.clone()];
        let k = group.len();
        let n = sample_count(k, ratio);

        let first = match &mut start {
            SamplingStart::First => 0,
            SamplingStart::Random(rng) => rng.gen_range(0..k),
        };

        min_dist.clear();
        min_dist.resize(k, f32::INFINITY);

        let mut current = first;
        for _ in 0..n {
            selected.push(range.start + current);
            min_dist[current] = f32::NEG_INFINITY;
            let anchor = group[current];

            let mut best = None::<(usize, f32)>;
            for (i, p) in group.iter().enumerate() {
                if min_dist[i] == f32::NEG_INFINITY {
                    continue;
                }
                let d = p.distance_squared(anchor);
                if d < min_dist[i] {
                    min_dist[i] = d;
                }
                if best.map_or(true, |(_, bd)| min_dist[i] > bd) {
                    best = Some((i, min_dist[i]));
                }
            }
            match best {
                Some((i, _)) => current = i,
                None => break,
            }
        }
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_count() {
        assert_eq!(sample_count(50, 0.5), 25);
        assert_eq!(sample_count(25, 0.5), 13);
        assert_eq!(sample_count(30, 0.1), 3);
        assert_eq!(sample_count(3, 0.01), 1);
        assert_eq!(sample_count(7, 1.0), 7);
        assert_eq!(sample_count(0, 0.5), 0);
    }

    #[test]
    fn test_picks_extremes_on_a_line() {
        let points: Vec<Point3> = (0..11).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect();
        let idx = farthest_point_sampling(&points, &[0; 11], 0.25, SamplingStart::First).unwrap();
        assert_eq!(idx, vec![0, 10, 5]);
    }

    #[test]
    fn test_per_batch_counts_and_offsets() {
        let points: Vec<Point3> = (0..10).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect();
        let batch = [0, 0, 0, 0, 1, 1, 1, 1, 1, 1];
        let idx = farthest_point_sampling(&points, &batch, 0.5, SamplingStart::First).unwrap();
        assert_eq!(idx.len(), 2 + 3);
        assert_eq!(idx[0], 0);
        assert_eq!(idx[2], 4);
        assert!(idx[..2].iter().all(|&i| i < 4));
        assert!(idx[2..].iter().all(|&i| i >= 4));
    }

    #[test]
    fn test_duplicates_are_not_reselected() {
        let points = vec![Point3::splat(1.0); 4];
        let idx = farthest_point_sampling(&points, &[0; 4], 1.0, SamplingStart::First).unwrap();
        let mut sorted = idx.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_random_start_is_reproducible() {
        let points: Vec<Point3> = (0..20).map(|i| Point3::new((i as f32).sin(), i as f32, 0.0)).collect();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            farthest_point_sampling(&points, &[0; 20], 0.25, SamplingStart::Random(&mut rng)).unwrap()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_invalid_inputs() {
        let p = vec![Point3::splat(0.0); 2];
        assert!(farthest_point_sampling(&p, &[0, 0], 0.0, SamplingStart::First).is_err());
        assert!(farthest_point_sampling(&p, &[0, 0], 1.5, SamplingStart::First).is_err());
        assert!(farthest_point_sampling(&p, &[1, 0], 0.5, SamplingStart::First).is_err());
        assert!(farthest_point_sampling(&p, &[0], 0.5, SamplingStart::First).is_err());
    }
}
