use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use vorotess::geometries::{ConvexPolyhedronGeometry, CylinderGeometry, InitialShapeGeometry, PlaneGeometry, SphereGeometry};
use vorotess::{BoundingBox, Container, ContainerConfig, Wall, WallGeometry, WALL_ID_MAX};

const NUM_POINTS: usize = 1000;

fn walled(geometry: Box<dyn WallGeometry>) -> Container {
    let config = ContainerConfig::new(BoundingBox::new([0.0; 3], [100.0; 3])).auto_grid(NUM_POINTS);
    let mut con = Container::new(config).unwrap();
    con.add_wall(Wall::new(WALL_ID_MAX, geometry).unwrap());
    con.fill_random(NUM_POINTS, &mut StdRng::seed_from_u64(3)).unwrap();
    con
}

fn benchmark_walls(c: &mut Criterion) {
    let cases: Vec<(&str, Box<dyn WallGeometry>)> = vec![
        ("plane", Box::new(PlaneGeometry::new([50.0; 3], [1.0, 1.0, 1.0]))),
        ("sphere", Box::new(SphereGeometry::new([50.0; 3], 40.0))),
        ("cylinder", Box::new(CylinderGeometry::new([50.0; 3], [0.0, 0.0, 1.0], 40.0))),
        ("octahedron", Box::new(ConvexPolyhedronGeometry::new_octahedron([50.0; 3], 45.0))),
        ("initial_cuboid", Box::new(InitialShapeGeometry::cuboid([10.0; 3], [90.0; 3]).unwrap())),
    ];
    let mut group = c.benchmark_group("walls");
    group.sample_size(20);
    for (name, geometry) in cases {
        let con = walled(geometry);
        group.bench_function(format!("{}_{}_points", name, NUM_POINTS), |b| {
            b.iter(|| con.compute_all_cells().unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_walls);
criterion_main!(benches);
