use std::f64::consts::PI;
use vorotess::geometries::{ConeGeometry, ConvexPolyhedronGeometry, CylinderGeometry, PlaneGeometry, SphereGeometry};
use vorotess::{BoundingBox, Container, ContainerConfig, Wall, WALL_ID_MAX};

/// Fills `con` with a simple cubic lattice of the given spacing. With
/// `inside_only`, points rejected by a wall are skipped.
fn fill_lattice(con: &mut Container, spacing: f64, inside_only: bool) -> usize {
    let b = *con.bounds();
    let n = ((b.extent(0) / spacing).round() as usize).max(1);
    let mut id = 0;
    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                let p = [
                    b.min[0] + (x as f64 + 0.5) * spacing,
                    b.min[1] + (y as f64 + 0.5) * spacing,
                    b.min[2] + (z as f64 + 0.5) * spacing,
                ];
                if (!inside_only || con.point_inside(&p)) && con.put(id, p).unwrap() {
                    id += 1;
                }
            }
        }
    }
    id as usize
}

fn relative_error(got: f64, expected: f64) -> f64 {
    (got - expected).abs() / expected
}

#[test]
fn test_unit_lattice_in_box() {
    let config = ContainerConfig::new(BoundingBox::new([0.0; 3], [2.0; 3])).grid(2, 2, 2);
    let mut con = Container::new(config).unwrap();
    assert_eq!(fill_lattice(&mut con, 1.0, true), 8);

    let volumes = con.par_map_cells(|_, cell| cell.volume()).unwrap();
    assert_eq!(volumes.len(), 8);
    for v in volumes {
        assert!((v.unwrap() - 1.0).abs() < 1e-12);
    }
    assert!((con.sum_cell_volumes().unwrap() - 8.0).abs() < 1e-12);
}

#[test]
fn test_random_points_fill_box() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let bounds = BoundingBox::new([-3.0, 0.0, 1.0], [7.0, 4.0, 3.0]);
    let config = ContainerConfig::new(bounds).auto_grid(2000);
    let mut con = Container::new(config).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    assert_eq!(con.fill_random(2000, &mut rng).unwrap(), 2000);

    let total = con.sum_cell_volumes().unwrap();
    println!("random fill: volume {:.12}, expected {:.12}", total, bounds.volume());
    assert!(relative_error(total, bounds.volume()) < 1e-9);
}

#[test]
fn test_sphere_volume_converges() {
    let expected = 4.0 / 3.0 * PI * 4.0f64.powi(3);
    let mut errors = Vec::new();
    for spacing in [1.0, 0.5] {
        let config = ContainerConfig::new(BoundingBox::new([-5.0; 3], [5.0; 3])).grid(6, 6, 6);
        let mut con = Container::new(config).unwrap();
        con.add_wall(Wall::new(WALL_ID_MAX, Box::new(SphereGeometry::new([0.0; 3], 4.0))).unwrap());
        fill_lattice(&mut con, spacing, true);
        let total = con.sum_cell_volumes().unwrap();
        let error = relative_error(total, expected);
        println!("sphere spacing {}: got {:.4}, expected {:.4}, error {:.3}%", spacing, total, expected, error * 100.0);
        // Tangent planes only ever remove space outside the sphere.
        assert!(total >= expected * (1.0 - 1e-9));
        errors.push(error);
    }
    assert!(errors[0] < 0.1);
    assert!(errors[1] < 0.05);
    assert!(errors[1] <= errors[0]);
}

macro_rules! test_wall_volume {
    ($test_name:ident, $wall:expr, $inside_only:expr, $expected:expr, $tolerance:expr) => {
        #[test]
        fn $test_name() {
            let config = ContainerConfig::new(BoundingBox::new([0.0; 3], [10.0; 3])).grid(5, 5, 5);
            let mut con = Container::new(config).unwrap();
            con.add_wall(Wall::new(WALL_ID_MAX - 1, Box::new($wall)).unwrap());
            fill_lattice(&mut con, 0.5, $inside_only);

            let total = con.sum_cell_volumes().unwrap();
            let expected: f64 = $expected;
            let error = relative_error(total, expected);
            println!("{}: got {:.4}, expected {:.4}, error {:.4}%", stringify!($test_name), total, expected, error * 100.0);
            assert!(error < $tolerance, "volume error too high: {:.4}%", error * 100.0);
        }
    };
}

test_wall_volume!(
    test_plane_halves_box,
    PlaneGeometry::new([5.0, 5.0, 5.0], [0.0, 0.0, 1.0]),
    true,
    500.0,
    1e-9
);
test_wall_volume!(
    test_cylinder_volume,
    CylinderGeometry::new([5.0, 5.0, 5.0], [0.0, 0.0, 1.0], 4.0),
    false,
    PI * 16.0 * 10.0,
    0.02
);
test_wall_volume!(
    test_cone_volume,
    ConeGeometry::new([5.0, 5.0, 2.0], [0.0, 0.0, 1.0], 0.5f64.atan()),
    false,
    128.0 / 3.0 * PI,
    0.05
);
test_wall_volume!(
    test_octahedron_volume,
    ConvexPolyhedronGeometry::new_octahedron([5.0, 5.0, 5.0], 4.0),
    true,
    // |x| + |y| + |z| <= 4 around the center.
    4.0 / 3.0 * 4.0f64.powi(3),
    1e-9
);
