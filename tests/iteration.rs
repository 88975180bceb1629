use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use vorotess::{BoundingBox, Container, ContainerConfig, LoopAll, LoopOrder, LoopSubset, ParticleOrder};

fn random_container(config: ContainerConfig, count: i32, seed: u64) -> (Container, Vec<[f64; 3]>) {
    let mut con = Container::new(config).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pts = Vec::new();
    for id in 0..count {
        let p = [rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0)];
        con.put(id, p).unwrap();
        pts.push(p);
    }
    (con, pts)
}

/// Ids and image positions found by a subset loop, checking that no id repeats.
fn collect(l: LoopSubset<'_>, con: &Container) -> HashMap<i32, [f64; 3]> {
    let mut found = HashMap::new();
    for (r, p) in l {
        let id = con.particle(r).id;
        assert!(found.insert(id, p).is_none(), "particle {} visited twice", id);
    }
    found
}

#[test]
fn test_loop_order_follows_insertion() {
    let config = ContainerConfig::new(BoundingBox::new([0.0; 3], [10.0; 3])).grid(3, 3, 3);
    let mut con = Container::new(config).unwrap();
    let mut order = ParticleOrder::with_capacity(50);
    let mut rng = StdRng::seed_from_u64(1);
    let mut expected = Vec::new();
    for id in 0..50 {
        let id = 100 - id;
        let p = [rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0)];
        assert!(con.put_ordered(&mut order, id, p).unwrap());
        expected.push(id);
    }
    assert!(!con.put_ordered(&mut order, 0, [11.0, 0.0, 0.0]).unwrap());
    assert_eq!(order.len(), 50);

    let ids: Vec<i32> = LoopOrder::new(&con, &order).map(|r| con.particle(r).id).collect();
    assert_eq!(ids, expected);

    // Storage order differs but covers the same particles.
    let mut all: Vec<i32> = LoopAll::new(&con).map(|r| con.particle(r).id).collect();
    all.sort();
    let mut sorted = expected.clone();
    sorted.sort();
    assert_eq!(all, sorted);
}

#[test]
fn test_sphere_subset_matches_brute_force() {
    let config = ContainerConfig::new(BoundingBox::new([0.0; 3], [10.0; 3])).grid(5, 5, 5);
    let (con, pts) = random_container(config, 500, 2);
    let (center, r) = ([2.0, 7.5, 4.0], 3.0);

    let mut l = LoopSubset::new(&con);
    l.setup_sphere(center, r, true);
    let found = collect(l, &con);

    for (id, p) in pts.iter().enumerate() {
        let d2: f64 = (0..3).map(|a| (p[a] - center[a]).powi(2)).sum();
        assert_eq!(found.contains_key(&(id as i32)), d2 <= r * r, "particle {} at {:?}", id, p);
    }
}

#[test]
fn test_box_subset_matches_brute_force() {
    let config = ContainerConfig::new(BoundingBox::new([0.0; 3], [10.0; 3])).grid(4, 4, 4);
    let (con, pts) = random_container(config, 400, 3);
    let (min, max) = ([1.0, 2.5, -1.0], [6.0, 4.0, 3.0]);

    let mut l = LoopSubset::new(&con);
    l.setup_box(min, max, true);
    let found = collect(l, &con);
    for (id, p) in pts.iter().enumerate() {
        let inside = (0..3).all(|a| p[a] >= min[a] && p[a] <= max[a]);
        assert_eq!(found.contains_key(&(id as i32)), inside);
    }

    // Without the bounds test the whole overlapped blocks are visited.
    let mut l = LoopSubset::new(&con);
    l.setup_box(min, max, false);
    let loose = collect(l, &con);
    assert!(loose.len() >= found.len());
    assert!(found.keys().all(|id| loose.contains_key(id)));
}

fn periodic_sphere_check(config: ContainerConfig, seed: u64) {
    let (con, pts) = random_container(config, 400, seed);
    let (center, r) = ([9.0, 0.5, 1.0], 3.0);

    let mut l = LoopSubset::new(&con);
    l.setup_sphere(center, r, true);
    let found = collect(l, &con);

    let mut stored = HashMap::new();
    let mut l = LoopAll::new(&con);
    let mut more = l.start();
    while more {
        stored.insert(l.id().unwrap(), l.pos().unwrap());
        more = l.advance();
    }
    assert_eq!(stored.len(), pts.len());

    // The sphere is narrower than any lattice vector, so at most one image of
    // each particle falls inside it.
    let shear = con.config().shear;
    for (&id, p) in &stored {
        let mut hit = None;
        for k in -1..=1 {
            for j in -2..=2 {
                for i in -2..=2 {
                    let (i, j, k) = (i as f64, j as f64, k as f64);
                    let img = [
                        p[0] + 10.0 * i + shear[0] * j + shear[1] * k,
                        p[1] + 10.0 * j + shear[2] * k,
                        p[2] + 10.0 * k,
                    ];
                    let d2: f64 = (0..3).map(|a| (img[a] - center[a]).powi(2)).sum();
                    if d2 <= r * r {
                        assert!(hit.is_none());
                        hit = Some(img);
                    }
                }
            }
        }
        match (hit, found.get(&id)) {
            (None, None) => {}
            (Some(img), Some(got)) => {
                for a in 0..3 {
                    assert!((img[a] - got[a]).abs() < 1e-9, "particle {}: {:?} vs {:?}", id, img, got);
                }
            }
            (want, got) => panic!("particle {}: expected {:?}, loop gave {:?}", id, want, got),
        }
    }
}

#[test]
fn test_periodic_sphere_subset_reports_images() {
    let config = ContainerConfig::new(BoundingBox::new([0.0; 3], [10.0; 3]))
        .grid(5, 5, 5)
        .periodic(true, true, true);
    periodic_sphere_check(config, 4);
}

#[test]
fn test_sheared_sphere_subset_reports_images() {
    let config = ContainerConfig::new(BoundingBox::new([0.0; 3], [10.0; 3]))
        .grid(5, 5, 5)
        .periodic(true, true, true)
        .shear(2.5, 0.0, 3.5);
    periodic_sphere_check(config, 5);
}

#[test]
fn test_intbox_walks_block_range() {
    let config = ContainerConfig::new(BoundingBox::new([0.0; 3], [10.0; 3])).grid(5, 5, 5);
    let (con, pts) = random_container(config, 300, 6);
    let mut l = LoopSubset::new(&con);
    l.setup_intbox([1, 1, -3], [2, 7, 0]);
    let found = collect(l, &con);
    for (id, p) in pts.iter().enumerate() {
        let inside = (2.0..6.0).contains(&p[0]) && p[1] >= 2.0 && p[2] < 2.0;
        assert_eq!(found.contains_key(&(id as i32)), inside, "particle {} at {:?}", id, p);
    }
}
