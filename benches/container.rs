use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vorotess::{BoundingBox, Container, ContainerConfig, LoopSubset};

const SIZES: [usize; 4] = [100, 1000, 10_000, 100_000];

fn filled(size: usize, poly: bool) -> Container {
    let bounds = BoundingBox::new([0.0; 3], [100.0; 3]);
    let config = ContainerConfig::new(bounds).auto_grid(size).poly(poly);
    let mut con = Container::new(config).unwrap();
    let mut rng = StdRng::seed_from_u64(size as u64);
    if poly {
        for id in 0..size {
            let p = [rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)];
            con.put_poly(id as i32, p, rng.gen_range(0.1..1.0)).unwrap();
        }
    } else {
        con.fill_random(size, &mut rng).unwrap();
    }
    con
}

fn benchmark_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_all_cells");
    group.sample_size(10);
    for &size in &SIZES {
        let con = filled(size, false);
        println!("N: {:7}, grid {:?}", size, con.grid());
        group.bench_with_input(BenchmarkId::new("voronoi", size), &con, |b, con| {
            b.iter(|| con.compute_all_cells().unwrap())
        });
        let poly = filled(size, true);
        group.bench_with_input(BenchmarkId::new("power", size), &poly, |b, con| {
            b.iter(|| con.compute_all_cells().unwrap())
        });
    }
    group.finish();
}

fn benchmark_insert(c: &mut Criterion) {
    c.bench_function("fill_random_10000", |b| {
        b.iter(|| filled(10_000, false))
    });
}

fn benchmark_queries(c: &mut Criterion) {
    let con = filled(10_000, false);
    c.bench_function("find_voronoi_cell_1000", |b| {
        b.iter(|| {
            for i in 0..1000 {
                let t = i as f64 * 0.1;
                black_box(con.find_voronoi_cell([t, 100.0 - t, 50.0]));
            }
        })
    });
    c.bench_function("subset_sphere_r10", |b| {
        b.iter(|| {
            let mut l = LoopSubset::new(&con);
            l.setup_sphere([50.0; 3], 10.0, true);
            l.count()
        })
    });
}

criterion_group!(benches, benchmark_scaling, benchmark_insert, benchmark_queries);
criterion_main!(benches);
