//! Multi-Scale Hierarchy Demo
//!
//! Builds a three-scale down block over two batched point clouds and reports
//! node counts, edge counts, mean degree and timing for every stage.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin hierarchy
//! cargo run --release --bin hierarchy -- --large  # 4x more points
//! ```

use std::env;
use std::f32::consts::PI;

use burn::backend::NdArray;
use burn::prelude::*;
use instant::Instant;
use neural_edf::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type DemoBackend = NdArray;

const IRREPS: &str = "8x0e+4x1o";

/// Noisy points on a sphere of radius `r` around `center`
fn sphere(n: usize, center: Point3, r: f32, rng: &mut StdRng) -> Vec<Point3> {
    (0..n)
        .map(|_| {
            let z: f32 = rng.gen_range(-1.0..1.0);
            let phi: f32 = rng.gen_range(0.0..2.0 * PI);
            let s = (1.0 - z * z).sqrt();
            let noise = 1.0 + rng.gen_range(-0.02..0.02);
            center + Point3::new(s * phi.cos(), s * phi.sin(), z) * (r * noise)
        })
        .collect()
}

/// Noisy points on a torus in the xy plane
fn torus(n: usize, major: f32, minor: f32, rng: &mut StdRng) -> Vec<Point3> {
    (0..n)
        .map(|_| {
            let u: f32 = rng.gen_range(0.0..2.0 * PI);
            let v: f32 = rng.gen_range(0.0..2.0 * PI);
            let ring = major + minor * v.cos();
            Point3::new(ring * u.cos(), ring * u.sin(), minor * v.sin())
        })
        .collect()
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let n = if args.iter().any(|a| a == "--large") { 2000 } else { 500 };

    println!("═══════════════════════════════════════════════════════════════");
    println!("          EDF Multi-Scale Hierarchy Demo");
    println!("═══════════════════════════════════════════════════════════════");
    println!();

    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(7);
    let mut points = sphere(n, Point3::splat(0.0), 0.5, &mut rng);
    points.extend(torus(n, 0.4, 0.1, &mut rng));
    let batch: Vec<i64> = (0..2 * n).map(|i| (i / n) as i64).collect();

    let irreps: Irreps = match IRREPS.parse() {
        Ok(irreps) => irreps,
        Err(e) => {
            eprintln!("Invalid irreps '{}': {}", IRREPS, e);
            std::process::exit(1);
        }
    };
    let features = Tensor::<DemoBackend, 2>::random(
        [points.len(), irreps.dim()],
        burn::tensor::Distribution::Normal(0.0, 1.0),
        &device,
    );
    let nodes = match PointSet::new(features, points, batch, irreps) {
        Ok(nodes) => nodes,
        Err(e) => {
            eprintln!("Error building point set: {}", e);
            std::process::exit(1);
        }
    };

    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Configuration                                               │");
    println!("└─────────────────────────────────────────────────────────────┘");
    let block = EquiformerBlockConfig::new(IRREPS.into(), IRREPS.into(), "4x0e+2x1o".into(), 2, vec![16, 32]);
    let config = DownBlockConfig::new(block, 0.1, 0.5, 3, 2)
        .with_pool_method(Some("fps".into()))
        .with_deterministic(true);
    println!("  Clouds:            2 x {} points", n);
    println!("  Irreps:            {}", IRREPS);
    println!("  Scales:            {}", config.n_scales);
    println!("  Radii:             {:?}", config.radii());
    println!();

    let start = Instant::now();
    let down = match config.init::<DemoBackend>(&device) {
        Ok(down) => down,
        Err(e) => {
            eprintln!("Error building down block: {}", e);
            std::process::exit(1);
        }
    };
    println!("  Init time:         {:.3}s", start.elapsed().as_secs_f64());
    println!();

    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Forward Pass                                                │");
    println!("└─────────────────────────────────────────────────────────────┘");
    let start = Instant::now();
    let levels = match down.forward(&nodes, &mut ForwardContext::inference()) {
        Ok(levels) => levels,
        Err(e) => {
            eprintln!("Error in forward pass: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    println!("  {:>5} {:>8} {:>8} {:>8} {:>10}", "scale", "radius", "nodes", "edges", "mean deg");
    for level in &levels {
        let mean = level.edges.len() as f64 / level.len().max(1) as f64;
        println!(
            "  {:>5} {:>8.3} {:>8} {:>8} {:>10.2}",
            level.scale,
            level.radius,
            level.len(),
            level.edges.len(),
            mean
        );
    }
    println!();
    println!("  Forward time:      {:.3}s", elapsed.as_secs_f64());
    println!();
    println!("Done.");
}
