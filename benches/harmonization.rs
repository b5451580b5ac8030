use colorharmonize::color::{Channel, ChannelHistogram, GlobalSolver, PairConstraint, RgbHistogram};
use colorharmonize::selection::{select_regions, Mask};
use colorharmonize::sfm::Feature;
use colorharmonize::{HarmonizeParams, SelectionMethod};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};

fn textured(width: u32, height: u32, gain: f64, offset: f64) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = 40.0 + ((x * 7 + y * 13) % 160) as f64;
        let c = (gain * v + offset).round().clamp(0.0, 255.0) as u8;
        Rgb([c, c.saturating_sub(10), c.saturating_add(10)])
    })
}

fn feature_grid(width: u32, height: u32, step: usize) -> Vec<(Feature, Feature)> {
    (8..height - 8)
        .step_by(step)
        .flat_map(|y| {
            (8..width - 8).step_by(step).map(move |x| {
                let f = Feature::new(x as f32, y as f32, 2.0, 0.0);
                (f, f)
            })
        })
        .collect()
}

fn benchmark_histograms(c: &mut Criterion) {
    let image = textured(1024, 768, 1.0, 0.0);
    let mask = Mask::full(1024, 768);

    c.bench_function("rgb_histogram_full_frame", |b| {
        b.iter(|| RgbHistogram::from_image_mask(black_box(&image), black_box(&mask)))
    });
}

fn benchmark_selection(c: &mut Criterion) {
    let image_i = textured(640, 480, 1.0, 0.0);
    let image_j = textured(640, 480, 0.8, 20.0);
    let points = feature_grid(640, 480, 24);
    let params = HarmonizeParams::default();

    let mut group = c.benchmark_group("select_regions");
    for method in [SelectionMethod::MatchedPoints, SelectionMethod::VldSegment] {
        group.bench_function(format!("{:?}", method), |b| {
            b.iter(|| select_regions(method, &image_i, &image_j, black_box(&points), &params))
        });
    }
    group.finish();
}

fn benchmark_solver(c: &mut Criterion) {
    let views = 12;
    let histograms: Vec<ChannelHistogram> = (0..views)
        .map(|k| {
            let image = textured(256, 256, 0.85 + 0.03 * k as f64, -8.0 + 2.0 * k as f64);
            let full = Mask::full(256, 256);
            RgbHistogram::from_image_mask(&image, &full).channels[Channel::Red.index()].clone()
        })
        .collect();

    // chain plus a few long-range links
    let mut constraints = Vec::new();
    for i in 0..views {
        for j in [i + 1, i + 3] {
            if j < views {
                if let Some(constraint) =
                    PairConstraint::from_histograms(i, j, &histograms[i], &histograms[j], 19)
                {
                    constraints.push(constraint);
                }
            }
        }
    }

    let solver = GlobalSolver::from_params(&HarmonizeParams::default());
    c.bench_function("solve_channel_12_views", |b| {
        b.iter(|| solver.solve(Channel::Red, views, 0, black_box(&constraints)))
    });
}

criterion_group!(
    benches,
    benchmark_histograms,
    benchmark_selection,
    benchmark_solver
);
criterion_main!(benches);
