use cloth_core::{
    cook, Cloth, ClothConfig, ClothError, ClothId, ClothSolver, Fabric, MeshDesc, PhaseConfig,
    SwSolver,
};
use glam::{Vec3, Vec4};
use wasm_bindgen::prelude::*;

/// GPU-compatible particle struct: 32 bytes, matches WGSL ClothParticle
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuParticle {
    position: [f32; 3], // 12 bytes
    inv_mass: f32,      //  4 bytes
    velocity: [f32; 3], // 12 bytes
    _pad: f32,          //  4 bytes
}

fn to_js(err: ClothError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// A single hanging cloth pinned along its top row.
#[wasm_bindgen]
pub struct ClothWorld {
    solver: SwSolver,
    cloth: ClothId,
    spheres: Vec<Vec4>,
    last_dt: f32,
    gpu_buffer: Vec<GpuParticle>,
}

#[wasm_bindgen]
impl ClothWorld {
    #[wasm_bindgen(constructor)]
    pub fn new(columns: u32, rows: u32, spacing: f32) -> Result<ClothWorld, JsValue> {
        let mut mesh = MeshDesc::grid(columns, rows, spacing);
        mesh.inv_masses = (0..columns * rows)
            .map(|i| if i < columns { 0.0 } else { 1.0 })
            .collect();

        let config = ClothConfig::silk();
        let cooked = cook(&mesh, config.gravity).map_err(to_js)?;
        let fabric = Fabric::new(cooked.desc).map_err(to_js)?;
        let phases: Vec<PhaseConfig> = (0..fabric.num_phases() as u16).map(PhaseConfig::new).collect();

        let mut cloth = Cloth::new(fabric, &mesh.particles()).map_err(to_js)?;
        cloth.set_phase_config(&phases).map_err(to_js)?;
        config.apply(&mut cloth).map_err(to_js)?;

        let num_particles = cloth.num_particles();
        let mut solver = SwSolver::new();
        let id = solver.add_cloth(cloth);

        web_sys::console::log_1(
            &format!(
                "WASM ClothWorld created: {}x{} grid, {} particles, {} phases",
                columns,
                rows,
                num_particles,
                phases.len()
            )
            .into(),
        );

        let mut world = ClothWorld {
            solver,
            cloth: id,
            spheres: Vec::new(),
            last_dt: 0.0,
            gpu_buffer: vec![bytemuck::Zeroable::zeroed(); num_particles],
        };
        world.write_gpu_output();
        Ok(world)
    }

    /// Advance one frame. Returns the wall-clock cost in milliseconds.
    #[wasm_bindgen]
    pub fn step(&mut self, dt: f32) -> f32 {
        let start = js_sys::Date::now();
        self.solver.simulate(dt);
        self.last_dt = dt;
        self.write_gpu_output();
        let elapsed = js_sys::Date::now() - start;
        elapsed as f32
    }

    #[wasm_bindgen]
    pub fn get_gpu_buffer_ptr(&self) -> *const f32 {
        self.gpu_buffer.as_ptr() as *const f32
    }

    #[wasm_bindgen]
    pub fn get_gpu_buffer_byte_length(&self) -> usize {
        self.gpu_buffer.len() * std::mem::size_of::<GpuParticle>()
    }

    /// Current positions as `x, y, z, inverse mass` per particle.
    #[wasm_bindgen]
    pub fn get_positions(&self) -> Vec<f32> {
        self.solver
            .cloth(self.cloth)
            .map(|c| c.particles().current_as_floats().to_vec())
            .unwrap_or_default()
    }

    #[wasm_bindgen]
    pub fn particle_count(&self) -> usize {
        self.gpu_buffer.len()
    }

    /// Switch to a named fabric preset ("silk" or "denim").
    #[wasm_bindgen]
    pub fn set_preset(&mut self, name: &str) -> Result<(), JsValue> {
        let config = match name {
            "silk" => ClothConfig::silk(),
            "denim" => ClothConfig::denim(),
            _ => return Err(JsValue::from_str(&format!("unknown cloth preset '{name}'"))),
        };
        config.apply(self.cloth_mut()?).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn set_wind(&mut self, x: f32, y: f32, z: f32) -> Result<(), JsValue> {
        self.cloth_mut()?.set_wind_velocity(Vec3::new(x, y, z));
        Ok(())
    }

    /// Move the cloth's frame. Particles follow through inertia.
    #[wasm_bindgen]
    pub fn set_translation(&mut self, x: f32, y: f32, z: f32) -> Result<(), JsValue> {
        self.cloth_mut()?.set_translation(Vec3::new(x, y, z));
        Ok(())
    }

    /// Add a collision sphere, or move sphere `index` if it already exists.
    #[wasm_bindgen]
    pub fn set_sphere(&mut self, index: usize, x: f32, y: f32, z: f32, radius: f32) -> Result<(), JsValue> {
        let sphere = Vec4::new(x, y, z, radius);
        match self.spheres.get_mut(index) {
            Some(s) => *s = sphere,
            None => self.spheres.push(sphere),
        }
        let spheres = self.spheres.clone();
        let cloth = self.cloth_mut()?;
        let existing = cloth.num_spheres();
        cloth.set_spheres(&spheres, 0, existing).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn clear_spheres(&mut self) -> Result<(), JsValue> {
        self.spheres.clear();
        let cloth = self.cloth_mut()?;
        let existing = cloth.num_spheres();
        cloth.set_spheres(&[], 0, existing).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn is_sleeping(&self) -> bool {
        self.solver
            .cloth(self.cloth)
            .map(|c| c.is_sleeping())
            .unwrap_or(false)
    }
}

impl ClothWorld {
    fn cloth_mut(&mut self) -> Result<&mut Cloth, JsValue> {
        self.solver.cloth_mut(self.cloth).map_err(to_js)
    }

    fn write_gpu_output(&mut self) {
        let Ok(cloth) = self.solver.cloth(self.cloth) else {
            return;
        };
        // previous positions trail by one solver iteration, not one frame
        let inv_dt = if self.last_dt > 0.0 {
            cloth.num_iterations(self.last_dt) as f32 / self.last_dt
        } else {
            0.0
        };
        let particles = cloth.current_particles().iter().zip(cloth.previous_particles());
        for (out, (cur, prev)) in self.gpu_buffer.iter_mut().zip(particles) {
            let vel = (*cur - *prev).truncate() * inv_dt;
            *out = GpuParticle {
                position: [cur.x, cur.y, cur.z],
                inv_mass: prev.w,
                velocity: [vel.x, vel.y, vel.z],
                _pad: 0.0,
            };
        }
    }
}
