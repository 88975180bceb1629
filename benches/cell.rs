use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vorotess::Cell;

/// Random bisector normals around the origin, as a dense packing would produce.
fn neighbors(count: usize) -> Vec<[f64; 3]> {
    let mut rng = StdRng::seed_from_u64(1);
    (0..count)
        .map(|_| [rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0)])
        .collect()
}

fn carved(track: bool, deltas: &[[f64; 3]]) -> Cell {
    let mut cell = Cell::new(track);
    cell.init_box([-1.0; 3], [1.0; 3]).unwrap();
    for (i, d) in deltas.iter().enumerate() {
        cell.cut_bisector(*d, i as i32).unwrap();
    }
    cell
}

fn benchmark_cut(c: &mut Criterion) {
    let deltas = neighbors(60);
    let mut cell = Cell::new(true);
    c.bench_function("cell_cut_60_planes", |b| {
        b.iter(|| {
            cell.init_box([-1.0; 3], [1.0; 3]).unwrap();
            for (i, d) in deltas.iter().enumerate() {
                black_box(cell.cut_bisector(*d, i as i32).unwrap());
            }
        })
    });

    let mut plain = Cell::new(false);
    c.bench_function("cell_cut_60_planes_untracked", |b| {
        b.iter(|| {
            plain.init_box([-1.0; 3], [1.0; 3]).unwrap();
            for (i, d) in deltas.iter().enumerate() {
                black_box(plain.cut_bisector(*d, i as i32).unwrap());
            }
        })
    });
}

fn benchmark_measures(c: &mut Criterion) {
    let cell = carved(true, &neighbors(60));
    c.bench_function("cell_volume", |b| b.iter(|| black_box(cell.volume())));
    c.bench_function("cell_centroid", |b| b.iter(|| black_box(cell.centroid())));
    c.bench_function("cell_neighbors", |b| b.iter(|| black_box(cell.neighbors())));
    c.bench_function("cell_minkowski", |b| b.iter(|| black_box(cell.minkowski(0.25))));
}

criterion_group!(benches, benchmark_cut, benchmark_measures);
criterion_main!(benches);
