use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use vorotess::{BoundingBox, Container, ContainerConfig, LoopAll};

fn cube() -> BoundingBox {
    BoundingBox::new([0.0; 3], [10.0; 3])
}

fn fill(con: &mut Container, count: i32, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let b = *con.bounds();
    for id in 0..count {
        let mut p = [0.0; 3];
        for a in 0..3 {
            p[a] = rng.gen_range(b.min[a]..b.max[a]);
        }
        assert!(con.put(id, p).unwrap());
    }
}

fn assert_fills(con: &Container) {
    let total = con.sum_cell_volumes().unwrap();
    let expected = con.total_volume();
    println!("periodic volume {:.10}, expected {:.10}", total, expected);
    assert!((total - expected).abs() / expected < 1e-8, "got {}, expected {}", total, expected);
}

#[test]
fn test_single_particle_fills_periodic_box() {
    let config = ContainerConfig::new(cube()).grid(3, 3, 3).periodic(true, true, true);
    let mut con = Container::new(config).unwrap();
    con.put(7, [2.0, 3.0, 4.0]).unwrap();

    let mut cell = con.new_cell();
    let r = LoopAll::new(&con).next().unwrap();
    assert!(con.compute_cell(&mut cell, r).unwrap());
    assert!((cell.volume() - 1000.0).abs() < 1e-8);
    let neighbors = cell.neighbors();
    assert_eq!(neighbors.len(), 6);
    assert!(neighbors.iter().all(|&n| n == 7));
}

#[test]
fn test_single_particle_periodic_in_x_only() {
    let config = ContainerConfig::new(cube()).grid(2, 2, 2).periodic(true, false, false);
    let mut con = Container::new(config).unwrap();
    con.put(0, [9.5, 1.0, 2.0]).unwrap();
    assert_fills(&con);
}

#[test]
fn test_positions_wrap_into_the_domain() {
    let config = ContainerConfig::new(cube()).grid(2, 2, 2).periodic(true, true, false);
    let mut con = Container::new(config).unwrap();
    assert!(con.put(0, [-3.0, 25.0, 5.0]).unwrap());
    assert!(!con.put(1, [5.0, 5.0, 10.5]).unwrap());
    let p = con.particle(LoopAll::new(&con).next().unwrap());
    assert!((p.pos[0] - 7.0).abs() < 1e-12);
    assert!((p.pos[1] - 5.0).abs() < 1e-12);
    assert_eq!(con.len(), 1);
}

#[test]
fn test_random_points_fill_periodic_box() {
    let config = ContainerConfig::new(cube()).auto_grid(500).periodic(true, true, true);
    let mut con = Container::new(config).unwrap();
    fill(&mut con, 500, 3);
    assert_fills(&con);
}

#[test]
fn test_random_points_fill_mixed_periodicity() {
    let config = ContainerConfig::new(cube()).grid(4, 4, 4).periodic(false, true, false);
    let mut con = Container::new(config).unwrap();
    fill(&mut con, 300, 4);
    assert_fills(&con);
}

#[test]
fn test_sheared_lattice_preserves_volume() {
    // The sheared domain has the same volume bx * by * bz as the box.
    let config = ContainerConfig::new(cube())
        .grid(4, 4, 4)
        .periodic(true, true, true)
        .shear(2.0, 1.5, -3.0);
    let mut con = Container::new(config).unwrap();
    fill(&mut con, 300, 5);
    assert_fills(&con);
}

#[test]
fn test_partial_periodicity_with_shear() {
    let config = ContainerConfig::new(cube())
        .grid(4, 4, 4)
        .periodic(true, false, true)
        .shear(0.0, 1.5, 0.0);
    let mut con = Container::new(config).unwrap();
    fill(&mut con, 200, 6);
    assert_fills(&con);
}

#[test]
fn test_sheared_single_particle_matches_domain() {
    let config = ContainerConfig::new(cube())
        .grid(2, 2, 2)
        .periodic(true, true, true)
        .shear(4.0, 0.0, 6.0);
    let mut con = Container::new(config).unwrap();
    con.put(0, [5.0; 3]).unwrap();
    assert_fills(&con);
}

#[test]
fn test_periodic_neighbor_reciprocity() {
    let config = ContainerConfig::new(cube())
        .grid(3, 3, 3)
        .periodic(true, true, true)
        .shear(1.0, 0.0, 2.5);
    let mut con = Container::new(config).unwrap();
    fill(&mut con, 150, 8);

    let map: HashMap<i32, Vec<i32>> = con
        .par_map_cells(|p, cell| (p.id, cell.neighbors()))
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(map.len(), 150);
    for (&id, neighbors) in &map {
        // A fully periodic cell has no box or wall faces.
        assert!(neighbors.iter().all(|&n| n >= 0), "cell {} has {:?}", id, neighbors);
        for &n in neighbors.iter().filter(|&&n| n != id) {
            assert!(map[&n].contains(&id), "cell {} claims {}, but {} has {:?}", id, n, n, map[&n]);
        }
    }
}

#[test]
fn test_point_location_across_the_boundary() {
    let config = ContainerConfig::new(cube()).grid(2, 2, 2).periodic(true, true, true);
    let mut con = Container::new(config).unwrap();
    con.put(0, [0.5, 5.0, 5.0]).unwrap();
    con.put(1, [5.0, 5.0, 5.0]).unwrap();

    // Closer to the image of particle 0 at x = 10.5 than to particle 1.
    let hit = con.find_voronoi_cell([9.0, 5.0, 5.0]).unwrap();
    assert_eq!(hit.id, 0);
    assert!((hit.pos[0] - 10.5).abs() < 1e-12);
}
