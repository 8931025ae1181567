//! Field Query Demo
//!
//! Runs the query model end to end: a two-stage hierarchy encoder over two
//! batched clouds, FPS query selection on the coarsest scale, then per-query
//! softmax weights and features from the field extractors.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin field_query
//! ```

use burn::backend::NdArray;
use burn::prelude::*;
use instant::Instant;
use neural_edf::ops::to_f32_vec;
use neural_edf::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type DemoBackend = NdArray;

/// Uniform points in an axis-aligned box
fn box_cloud(n: usize, half: Point3, rng: &mut StdRng) -> Vec<Point3> {
    (0..n)
        .map(|_| {
            Point3::new(
                rng.gen_range(-half.x..half.x),
                rng.gen_range(-half.y..half.y),
                rng.gen_range(-half.z..half.z),
            )
        })
        .collect()
}

fn exit_on_error<T>(result: Result<T>, what: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error {}: {}", what, e);
            std::process::exit(1);
        }
    }
}

fn main() {
    println!("═══════════════════════════════════════════════════════════════");
    println!("          EDF Field Query Demo");
    println!("═══════════════════════════════════════════════════════════════");
    println!();

    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(3);
    let mut points = box_cloud(400, Point3::new(0.3, 0.2, 0.05), &mut rng);
    points.extend(box_cloud(300, Point3::new(0.1, 0.1, 0.3), &mut rng));
    let batch: Vec<i64> = [vec![0; 400], vec![1; 300]].concat();

    let irreps_input = "3x0e";
    let irreps: Irreps = exit_on_error(irreps_input.parse::<Irreps>().map_err(Into::into), "parsing irreps");
    // colour-like scalar features
    let features = Tensor::<DemoBackend, 2>::random(
        [points.len(), irreps.dim()],
        burn::tensor::Distribution::Uniform(0.0, 1.0),
        &device,
    );
    let nodes = exit_on_error(PointSet::new(features, points, batch, irreps), "building point set");

    let fine = EquiformerBlockConfig::new("8x0e+4x1o".into(), "8x0e+4x1o".into(), "4x0e+2x1o".into(), 2, vec![16, 32]);
    let mut coarse = fine.for_irreps("16x0e+8x1o", "16x0e+8x1o");
    coarse.irreps_head = "8x0e+4x1o".into();
    let encoder = HierarchyEncoderConfig::new(
        irreps_input.into(),
        vec![
            DownBlockConfig::new(fine, 0.04, 0.3, 2, 2)
                .with_pool_method(Some("fps".into()))
                .with_deterministic(true),
            DownBlockConfig::new(coarse, 0.15, 0.5, 1, 2)
                .with_pool_method(Some("fps".into()))
                .with_deterministic(true),
        ],
    );
    let config = QueryModelConfig::new(encoder, vec![0.05, 0.1, 0.2], 16, 0.5)
        .with_min_offset(0.0)
        .with_deterministic(true);
    println!("  Scales:            {}", config.encoder.num_scales());
    println!("  Cutoffs:           {:?}", config.cutoff_radius);
    println!("  Offsets:           {:?}", config.offsets());
    println!();

    let start = Instant::now();
    let model = exit_on_error(config.init::<DemoBackend>(&device), "building query model");
    println!("  Init time:         {:.3}s", start.elapsed().as_secs_f64());

    let start = Instant::now();
    let output = exit_on_error(model.forward(&nodes, &mut ForwardContext::inference()), "in forward pass");
    println!("  Forward time:      {:.3}s", start.elapsed().as_secs_f64());
    println!();

    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Scales                                                      │");
    println!("└─────────────────────────────────────────────────────────────┘");
    for (s, level) in output.scales.iter().enumerate() {
        println!(
            "  scale {}: {:>4} nodes, {:>6} edges, r = {:.3}, irreps {}",
            s,
            level.len(),
            level.edges.len(),
            level.radius,
            level.nodes.irreps
        );
    }
    println!();

    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Queries                                                     │");
    println!("└─────────────────────────────────────────────────────────────┘");
    let weights = exit_on_error(to_f32_vec(output.weights.clone()), "reading weights");
    for id in [0i64, 1] {
        let total: f32 = weights
            .iter()
            .zip(&output.batch_ids)
            .filter(|(_, b)| **b == id)
            .map(|(w, _)| w)
            .sum();
        let count = output.batch_ids.iter().filter(|&&b| b == id).count();
        println!("  batch {}: {:>3} queries, weight sum {:.4}", id, count, total);
    }
    println!("  feature irreps:    {}", model.irreps_out());
    println!("  feature shape:     {:?}", output.features.dims());
    println!();
    println!("Done.");
}
