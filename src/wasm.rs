use crate::bounds::BoundingBox;
use crate::cell::Cell;
use crate::container::config::ContainerConfig;
use crate::container::Container;
use crate::error::VoroError;
use crate::loops::LoopAll;
use crate::wall::geometries::*;
use crate::wall::{Wall, WallGeometry};
use js_sys::{Array, Function, Reflect};
use rand::rngs::StdRng;
use rand::SeedableRng;
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen_rayon::init_thread_pool;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn init_threads(n: usize) -> js_sys::Promise {
    init_thread_pool(n)
}

fn js_err(e: VoroError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// --- Bounding Box ---

#[wasm_bindgen(typescript_custom_section)]
const TS_CONSTANTS_BOUNDS: &'static str = r#"
export const BOX_ID_LEFT = -1;
export const BOX_ID_RIGHT = -2;
export const BOX_ID_FRONT = -3;
export const BOX_ID_BACK = -4;
export const BOX_ID_BOTTOM = -5;
export const BOX_ID_TOP = -6;
"#;

/// Represents an axis-aligned bounding box in 3D space.
#[wasm_bindgen]
#[derive(Clone, Copy, Debug)]
pub struct BoundingBox3D {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

#[wasm_bindgen]
impl BoundingBox3D {
    #[wasm_bindgen(constructor)]
    pub fn new(min_x: f64, min_y: f64, min_z: f64, max_x: f64, max_y: f64, max_z: f64) -> BoundingBox3D {
        BoundingBox3D { min_x, min_y, min_z, max_x, max_y, max_z }
    }
}

impl From<BoundingBox3D> for BoundingBox {
    fn from(b: BoundingBox3D) -> Self {
        BoundingBox::new([b.min_x, b.min_y, b.min_z], [b.max_x, b.max_y, b.max_z])
    }
}

// --- Wall ---

#[wasm_bindgen(typescript_custom_section)]
const TS_CONSTANTS_WALL: &'static str = r#"
export const WALL_ID_MAX = -1000;
"#;

/// WASM wrapper for walls. The wall is moved into a container by `add_wall`.
#[wasm_bindgen]
pub struct Wall3D {
    inner: Option<Wall>,
}

fn wall3d(id: i32, geometry: Box<dyn WallGeometry>) -> Result<Wall3D, JsValue> {
    Ok(Wall3D { inner: Some(Wall::new(id, geometry).map_err(js_err)?) })
}

#[wasm_bindgen]
impl Wall3D {
    #[wasm_bindgen(js_name = newCustom)]
    pub fn new_custom(val: JsValue, id: i32) -> Result<Wall3D, JsValue> {
        wall3d(id, Box::new(JsWallGeometry { val }))
    }

    #[wasm_bindgen(getter)]
    pub fn id(&self) -> Option<i32> {
        self.inner.as_ref().map(|w| w.id())
    }

    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        self.inner.as_ref().is_some_and(|w| w.contains(&[x, y, z]))
    }

    pub fn new_plane(px: f64, py: f64, pz: f64, nx: f64, ny: f64, nz: f64, id: i32) -> Result<Wall3D, JsValue> {
        wall3d(id, Box::new(PlaneGeometry::new([px, py, pz], [nx, ny, nz])))
    }

    pub fn new_sphere(cx: f64, cy: f64, cz: f64, radius: f64, id: i32) -> Result<Wall3D, JsValue> {
        wall3d(id, Box::new(SphereGeometry::new([cx, cy, cz], radius)))
    }

    pub fn new_shell(cx: f64, cy: f64, cz: f64, inner_radius: f64, outer_radius: f64, id: i32) -> Result<Wall3D, JsValue> {
        wall3d(id, Box::new(SphericalShellGeometry::new([cx, cy, cz], inner_radius, outer_radius)))
    }

    pub fn new_cylinder(cx: f64, cy: f64, cz: f64, ax: f64, ay: f64, az: f64, radius: f64, id: i32) -> Result<Wall3D, JsValue> {
        wall3d(id, Box::new(CylinderGeometry::new([cx, cy, cz], [ax, ay, az], radius)))
    }

    pub fn new_finite_cylinder(
        bx: f64,
        by: f64,
        bz: f64,
        ax: f64,
        ay: f64,
        az: f64,
        length: f64,
        radius: f64,
        id: i32,
    ) -> Result<Wall3D, JsValue> {
        wall3d(id, Box::new(FiniteCylinderGeometry::new([bx, by, bz], [ax, ay, az], length, radius)))
    }

    pub fn new_cone(tx: f64, ty: f64, tz: f64, ax: f64, ay: f64, az: f64, angle: f64, id: i32) -> Result<Wall3D, JsValue> {
        wall3d(id, Box::new(ConeGeometry::new([tx, ty, tz], [ax, ay, az], angle)))
    }

    /// Planes given as flat `[x, y, z, ...]` points and outward normals.
    pub fn new_convex_polyhedron(points: &[f64], normals: &[f64], id: i32) -> Result<Wall3D, JsValue> {
        if points.len() != normals.len() || points.len() % 3 != 0 {
            return Err(JsValue::from_str("points and normals must be equal-length lists of coordinates"));
        }
        let planes = points
            .chunks_exact(3)
            .zip(normals.chunks_exact(3))
            .map(|(p, n)| ([p[0], p[1], p[2]], [n[0], n[1], n[2]]))
            .collect();
        wall3d(id, Box::new(ConvexPolyhedronGeometry::new(planes)))
    }

    pub fn new_tetrahedron(cx: f64, cy: f64, cz: f64, radius: f64, id: i32) -> Result<Wall3D, JsValue> {
        wall3d(id, Box::new(ConvexPolyhedronGeometry::new_tetrahedron([cx, cy, cz], radius)))
    }

    pub fn new_hexahedron(cx: f64, cy: f64, cz: f64, radius: f64, id: i32) -> Result<Wall3D, JsValue> {
        wall3d(id, Box::new(ConvexPolyhedronGeometry::new_hexahedron([cx, cy, cz], radius)))
    }

    pub fn new_octahedron(cx: f64, cy: f64, cz: f64, radius: f64, id: i32) -> Result<Wall3D, JsValue> {
        wall3d(id, Box::new(ConvexPolyhedronGeometry::new_octahedron([cx, cy, cz], radius)))
    }

    /// Replaces the starting box of every cell by an octahedron.
    pub fn new_initial_octahedron(cx: f64, cy: f64, cz: f64, l: f64, id: i32) -> Result<Wall3D, JsValue> {
        let shape = InitialShapeGeometry::octahedron([cx, cy, cz], l).map_err(js_err)?;
        wall3d(id, Box::new(shape))
    }

    /// Replaces the starting box of every cell by a cuboid.
    pub fn new_initial_cuboid(
        min_x: f64,
        min_y: f64,
        min_z: f64,
        max_x: f64,
        max_y: f64,
        max_z: f64,
        id: i32,
    ) -> Result<Wall3D, JsValue> {
        let shape = InitialShapeGeometry::cuboid([min_x, min_y, min_z], [max_x, max_y, max_z]).map_err(js_err)?;
        wall3d(id, Box::new(shape))
    }
}

impl Wall3D {
    pub fn take_inner(&mut self) -> Option<Wall> {
        self.inner.take()
    }
}

struct JsWallGeometry {
    val: JsValue,
}

unsafe impl Send for JsWallGeometry {}
unsafe impl Sync for JsWallGeometry {}

impl std::fmt::Debug for JsWallGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JsWallGeometry")
    }
}

impl WallGeometry for JsWallGeometry {
    fn contains(&self, point: &[f64; 3]) -> bool {
        if let Ok(func) = Reflect::get(&self.val, &"contains".into()).and_then(|f| f.dyn_into::<Function>()) {
            let args = Array::of3(&point[0].into(), &point[1].into(), &point[2].into());
            if let Ok(res) = func.apply(&self.val, &args) {
                return res.as_bool().unwrap_or(false);
            }
        }
        false
    }

    fn cut(&self, generator: &[f64; 3], callback: &mut dyn FnMut([f64; 3], [f64; 3])) {
        let Ok(func) = Reflect::get(&self.val, &"cut".into()).and_then(|f| f.dyn_into::<Function>()) else {
            return;
        };
        let args = Array::of3(&generator[0].into(), &generator[1].into(), &generator[2].into());
        let Ok(res) = func.apply(&self.val, &args) else {
            return;
        };
        if res.is_null() || res.is_undefined() {
            return;
        }
        match res.dyn_into::<Array>() {
            Ok(arr) => {
                for item in arr.iter() {
                    if let Some((p, n)) = parse_js_cut_result(&item) {
                        callback(p, n);
                    }
                }
            }
            Err(single) => {
                if let Some((p, n)) = parse_js_cut_result(&single) {
                    callback(p, n);
                }
            }
        }
    }
}

fn parse_js_cut_result(val: &JsValue) -> Option<([f64; 3], [f64; 3])> {
    let p = Reflect::get(val, &"point".into()).ok().and_then(|v| v.dyn_into::<Array>().ok())?;
    let n = Reflect::get(val, &"normal".into()).ok().and_then(|v| v.dyn_into::<Array>().ok())?;
    Some((
        [p.get(0).as_f64()?, p.get(1).as_f64()?, p.get(2).as_f64()?],
        [n.get(0).as_f64()?, n.get(1).as_f64()?, n.get(2).as_f64()?],
    ))
}

// --- Cell ---

/// A computed cell, read out into flat arrays for JS.
#[wasm_bindgen(js_name = Cell)]
pub struct Cell3D {
    id: i32,
    generator: [f64; 3],
    inner: Cell,
}

#[wasm_bindgen(js_class = Cell)]
impl Cell3D {
    #[wasm_bindgen(getter)]
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Vertex positions in absolute coordinates, flattened.
    #[wasm_bindgen(getter)]
    pub fn vertices(&self) -> Vec<f64> {
        self.inner.vertices_at(self.generator).into_iter().flatten().collect()
    }

    #[wasm_bindgen(getter)]
    pub fn face_counts(&self) -> Vec<u32> {
        self.inner.face_orders().into_iter().map(|n| n as u32).collect()
    }

    #[wasm_bindgen(getter)]
    pub fn face_indices(&self) -> Vec<u32> {
        self.inner.face_vertices().into_iter().flatten().map(|v| v as u32).collect()
    }

    #[wasm_bindgen(getter)]
    pub fn face_neighbors(&self) -> Vec<i32> {
        self.inner.neighbors()
    }

    pub fn volume(&self) -> f64 {
        self.inner.volume()
    }

    pub fn surface_area(&self) -> f64 {
        self.inner.surface_area()
    }

    pub fn centroid(&self) -> Vec<f64> {
        let c = self.inner.centroid();
        vec![c[0] + self.generator[0], c[1] + self.generator[1], c[2] + self.generator[2]]
    }
}

// --- Container ---

#[wasm_bindgen(js_name = Container)]
pub struct Container3D {
    inner: Container,
}

#[wasm_bindgen(js_class = Container)]
impl Container3D {
    #[wasm_bindgen(constructor)]
    pub fn new(
        bounds: BoundingBox3D,
        nx: usize,
        ny: usize,
        nz: usize,
        periodic_x: bool,
        periodic_y: bool,
        periodic_z: bool,
        poly: bool,
    ) -> Result<Container3D, JsValue> {
        let config = ContainerConfig::new(bounds.into())
            .grid(nx, ny, nz)
            .periodic(periodic_x, periodic_y, periodic_z)
            .poly(poly);
        Ok(Container3D { inner: Container::new(config).map_err(js_err)? })
    }

    pub fn put(&mut self, id: i32, x: f64, y: f64, z: f64) -> Result<bool, JsValue> {
        self.inner.put(id, [x, y, z]).map_err(js_err)
    }

    pub fn put_poly(&mut self, id: i32, x: f64, y: f64, z: f64, radius: f64) -> Result<bool, JsValue> {
        self.inner.put_poly(id, [x, y, z], radius).map_err(js_err)
    }

    /// Inserts a particle and returns the `[i, j, k]` periodic image it was
    /// wrapped from, or `undefined` if it lies outside the container.
    pub fn put_with_image(&mut self, id: i32, x: f64, y: f64, z: f64) -> Result<Option<Vec<i32>>, JsValue> {
        let image = self.inner.put_with_image(id, [x, y, z]).map_err(js_err)?;
        Ok(image.map(|n| n.to_vec()))
    }

    /// Replaces all particles by flat `[x, y, z, ...]` positions numbered from zero.
    pub fn set_particles(&mut self, positions: &[f64]) -> Result<usize, JsValue> {
        self.inner.clear();
        let mut placed = 0;
        for (i, p) in positions.chunks_exact(3).enumerate() {
            if self.inner.put(i as i32, [p[0], p[1], p[2]]).map_err(js_err)? {
                placed += 1;
            }
        }
        Ok(placed)
    }

    pub fn random_particles(&mut self, count: usize) -> Result<usize, JsValue> {
        let mut rng = StdRng::seed_from_u64(get_seed());
        self.inner.fill_random(count, &mut rng).map_err(js_err)
    }

    pub fn add_wall(&mut self, mut wall: Wall3D) {
        if let Some(w) = wall.take_inner() {
            self.inner.add_wall(w);
        }
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    #[wasm_bindgen(getter)]
    pub fn count(&self) -> usize {
        self.inner.len()
    }

    pub fn sum_cell_volumes(&self) -> Result<f64, JsValue> {
        self.inner.sum_cell_volumes().map_err(js_err)
    }

    /// Computes every cell in parallel, in block storage order.
    pub fn cells(&self) -> Result<Vec<Cell3D>, JsValue> {
        let cells = self
            .inner
            .par_map_cells(|p, cell| Cell3D { id: p.id, generator: p.pos, inner: cell.clone() })
            .map_err(js_err)?;
        Ok(cells.into_iter().flatten().collect())
    }

    /// Computes the cell of the particle with the given id.
    pub fn cell(&self, id: i32) -> Result<Option<Cell3D>, JsValue> {
        let Some(r) = LoopAll::new(&self.inner).find(|&r| self.inner.particle(r).id == id) else {
            return Ok(None);
        };
        let mut cell = self.inner.new_cell();
        if !self.inner.compute_cell(&mut cell, r).map_err(js_err)? {
            return Ok(None);
        }
        let p = self.inner.particle(r);
        Ok(Some(Cell3D { id: p.id, generator: p.pos, inner: cell }))
    }

    /// Id of the particle whose cell contains the point.
    pub fn find(&self, x: f64, y: f64, z: f64) -> Option<i32> {
        self.inner.find_voronoi_cell([x, y, z]).map(|l| l.id)
    }
}

fn get_seed() -> u64 {
    #[cfg(target_arch = "wasm32")]
    {
        (js_sys::Math::random() * 4294967296.0) as u64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        123456789
    }
}
