//! Property tests for the spatial queries.
//!
//! The radius search is checked against a brute-force reference, and the
//! sampler against the per-batch count rule.

use edf_core::prelude::*;
use proptest::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

fn cloud() -> impl Strategy<Value = (Vec<Point3>, Vec<i64>)> {
    prop::collection::vec(
        (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0, 0i64..3),
        1..60,
    )
    .prop_map(|mut raw| {
        raw.sort_by_key(|r| r.3);
        let points = raw.iter().map(|r| Point3::new(r.0, r.1, r.2)).collect();
        let batch = raw.iter().map(|r| r.3).collect();
        (points, batch)
    })
}

fn brute_force(points: &[Point3], batch: &[i64], radius: f32) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for d in 0..points.len() {
        for s in 0..points.len() {
            if s != d && batch[s] == batch[d] && points[s].distance_squared(points[d]) <= radius * radius {
                pairs.push((s, d));
            }
        }
    }
    pairs.sort_by_key(|&(s, d)| (d, s));
    pairs
}

// =============================================================================
// Radius search
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Uncapped radius graph equals the brute-force pair set
    #[test]
    fn radius_graph_matches_brute_force((points, batch) in cloud(), radius in 0.05f32..1.5) {
        let edges = radius_graph(&points, &batch, radius, usize::MAX).unwrap();
        let got: Vec<(usize, usize)> = edges.src.iter().copied().zip(edges.dst.iter().copied()).collect();
        prop_assert_eq!(got, brute_force(&points, &batch, radius));
    }

    /// The cap bounds every destination's degree and keeps a prefix of the full list
    #[test]
    fn neighbor_cap_truncates((points, batch) in cloud(), cap in 1usize..5) {
        let full = radius_graph(&points, &batch, 0.8, usize::MAX).unwrap();
        let capped = radius_graph(&points, &batch, 0.8, cap).unwrap();
        let full_deg = full.degree(points.len());
        let capped_deg = capped.degree(points.len());
        for (f, c) in full_deg.iter().zip(&capped_deg) {
            prop_assert_eq!(*c, (*f).min(cap));
        }
    }

    /// No edge ever joins two batches
    #[test]
    fn edges_stay_in_batch((points, batch) in cloud(), radius in 0.05f32..3.0) {
        let edges = radius_graph(&points, &batch, radius, 1000).unwrap();
        for (s, d) in edges.src.iter().zip(&edges.dst) {
            prop_assert_eq!(batch[*s], batch[*d]);
        }
    }
}

// =============================================================================
// Farthest-point sampling
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Each batch group yields max(1, ceil(ratio * k)) distinct samples from that group
    #[test]
    fn fps_counts_per_batch((points, batch) in cloud(), ratio in 0.01f32..=1.0) {
        let idx = farthest_point_sampling(&points, &batch, ratio, SamplingStart::First).unwrap();
        let segments = BatchSegments::from_batch(&batch).unwrap();

        let mut offset = 0;
        for (_, range) in segments.groups() {
            let n = sample_count(range.len(), ratio);
            prop_assert!(n >= 1);
            let chunk = &idx[offset..offset + n];
            prop_assert_eq!(chunk[0], range.start);
            prop_assert!(chunk.iter().all(|i| range.contains(i)));
            let mut unique = chunk.to_vec();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), n);
            offset += n;
        }
        prop_assert_eq!(offset, idx.len());
    }
}

// =============================================================================
// Cutoff windows
// =============================================================================

proptest! {
    /// Windows stay inside [0, 1]
    #[test]
    fn windows_are_bounded(x in -2.0f32..3.0) {
        let a = soft_cutoff(x, 0.8, 3);
        let b = soft_square_cutoff(x, 0.8, 3);
        prop_assert!((0.0..=1.0).contains(&a));
        prop_assert!((0.0..=1.0).contains(&b));
    }
}
