use cloth_core::{cook, Cloth, ClothError, ClothSolver, Fabric, FabricDesc, MeshDesc, SwSolver};
use glam::{Quat, Vec3, Vec4};

const FRAME: f32 = 1.0 / 60.0;

/// Quad grid hanging from its top row, which is pinned.
fn pinned_grid(columns: u32, rows: u32, spacing: f32) -> Cloth {
    let mut mesh = MeshDesc::grid(columns, rows, spacing);
    mesh.inv_masses = (0..columns * rows)
        .map(|i| if i < columns { 0.0 } else { 1.0 })
        .collect();
    let cooked = cook(&mesh, Vec3::NEG_Y).expect("grid mesh cooks");
    let fabric = Fabric::new(cooked.desc).expect("cooked fabric is valid");
    Cloth::new(fabric, &mesh.particles()).expect("particle count matches fabric")
}

/// Unconnected unit-mass particles.
fn loose_particles(positions: &[Vec3]) -> Cloth {
    let fabric = Fabric::new(FabricDesc {
        num_particles: positions.len() as u32,
        ..Default::default()
    })
    .expect("empty fabric is valid");
    let particles: Vec<Vec4> = positions.iter().map(|p| p.extend(1.0)).collect();
    Cloth::new(fabric, &particles).expect("particle count matches fabric")
}

fn simulate(cloth: Cloth, dt: f32, frames: u32) -> Cloth {
    let mut solver = SwSolver::new();
    let id = solver.add_cloth(cloth);
    for _ in 0..frames {
        solver.simulate(dt);
    }
    solver.remove_cloth(id).expect("cloth was added")
}

#[test]
fn test_null_integration_leaves_particles_in_place() {
    let mut cloth = pinned_grid(5, 5, 0.1);
    cloth.set_phase_config(&[]).unwrap();
    cloth.set_tether_constraint_stiffness(0.0).unwrap();
    let before = cloth.current_particles().to_vec();

    let cloth = simulate(cloth, FRAME, 1);

    for (i, (a, b)) in before.iter().zip(cloth.current_particles()).enumerate() {
        let moved = (*b - *a).truncate().length();
        assert!(moved < 1e-6, "particle {} moved by {} without any force", i, moved);
    }
}

#[test]
fn test_motion_constraint_keeps_particles_inside_sphere() {
    let mut cloth = loose_particles(&[
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(0.0, -3.0, 1.0),
        Vec3::new(0.2, 0.0, 0.0),
    ]);
    cloth.set_solver_frequency(60.0).unwrap();
    for sphere in cloth.push_motion_constraints() {
        *sphere = Vec4::new(0.0, 0.0, 0.0, 1.0);
    }

    let cloth = simulate(cloth, FRAME, 1);

    for (i, p) in cloth.current_particles().iter().enumerate() {
        let d = p.truncate().length();
        assert!(d <= 1.0 + 1e-3, "particle {} at distance {} outside radius 1", i, d);
    }
    let inside = cloth.current_particles()[2];
    assert!(
        (inside.x - 0.2).abs() < 1e-6,
        "particle already inside moved to {:?}",
        inside
    );
}

#[test]
fn test_motion_constraint_scale_and_bias() {
    let mut cloth = loose_particles(&[Vec3::new(3.0, 0.0, 0.0)]);
    cloth.set_solver_frequency(60.0).unwrap();
    cloth.set_motion_constraint_scale_bias(0.5, 0.25);
    cloth.push_motion_constraints()[0] = Vec4::new(0.0, 0.0, 0.0, 2.0);

    let cloth = simulate(cloth, FRAME, 1);

    // effective radius 2 * 0.5 + 0.25
    let d = cloth.current_particles()[0].truncate().length();
    assert!((d - 1.25).abs() < 1e-3, "distance {} expected 1.25", d);
}

#[test]
fn test_zero_radius_motion_constraint_pins_particle() {
    let mut cloth = loose_particles(&[Vec3::new(0.5, 0.0, 0.0)]);
    cloth.set_solver_frequency(60.0).unwrap();
    cloth.push_motion_constraints()[0] = Vec4::new(0.0, 0.0, 0.0, 0.0);

    let cloth = simulate(cloth, FRAME, 1);

    let p = cloth.current_particles()[0];
    assert!(p.truncate().length() < 1e-3, "pinned particle at {:?}", p);
    assert_eq!(p.w, 0.0, "current inverse mass stays zeroed");
    assert_eq!(cloth.previous_particles()[0].w, 1.0, "user inverse mass kept in previous");
}

#[test]
fn test_separation_constraint_pushes_out() {
    let mut cloth = loose_particles(&[Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0)]);
    cloth.set_solver_frequency(60.0).unwrap();
    for sphere in cloth.push_separation_constraints() {
        *sphere = Vec4::new(0.0, 0.0, 0.0, 1.0);
    }

    let cloth = simulate(cloth, FRAME, 1);

    let near = cloth.current_particles()[0].truncate().length();
    assert!(near >= 1.0 - 1e-4, "particle still inside separation sphere: {}", near);
    let far = cloth.current_particles()[1];
    assert!(
        (far.y - 3.0).abs() < 1e-6,
        "separation never pulls inward, particle moved to {:?}",
        far
    );
}

#[test]
fn test_sleep_after_consecutive_quiet_tests() {
    let mut cloth = loose_particles(&[Vec3::ZERO]);
    cloth.set_solver_frequency(60.0).unwrap();
    cloth.set_sleep_threshold(0.1);
    cloth.set_sleep_test_interval(16);
    cloth.set_sleep_after_count(3);

    let mut solver = SwSolver::new();
    let id = solver.add_cloth(cloth);
    for frame in 1..=4u32 {
        solver.simulate(FRAME);
        let cloth = solver.cloth(id).unwrap();
        assert_eq!(cloth.sleep_pass_count(), frame, "one sleep test per frame");
        assert_eq!(
            cloth.is_sleeping(),
            frame >= 3,
            "sleeping after frame {}: {}",
            frame,
            cloth.is_sleeping()
        );
    }
}

#[test]
fn test_sleep_counter_resets_on_movement() {
    // a falling particle passes while slower than the threshold
    let mut cloth = loose_particles(&[Vec3::ZERO]);
    cloth.set_solver_frequency(60.0).unwrap();
    cloth.set_gravity(Vec3::new(0.0, -1.0, 0.0));
    cloth.set_sleep_threshold(0.045);
    cloth.set_sleep_test_interval(16);
    cloth.set_sleep_after_count(5);

    let mut solver = SwSolver::new();
    let id = solver.add_cloth(cloth);
    let mut counts = Vec::new();
    for _ in 0..6 {
        solver.simulate(FRAME);
        counts.push(solver.cloth(id).unwrap().sleep_pass_count());
    }

    assert_eq!(counts, vec![1, 2, 0, 0, 0, 0], "pass counts per frame");
    assert!(!solver.cloth(id).unwrap().is_sleeping());
}

#[test]
fn test_pinned_grid_converges_to_rest_lengths() {
    let mut cloth = pinned_grid(10, 10, 0.1);
    cloth.set_gravity(Vec3::new(0.0, -9.81, 0.0));

    let cloth = simulate(cloth, FRAME, 200);

    let particles = cloth.current_particles();
    for (i, p) in particles.iter().enumerate() {
        assert!(p.is_finite(), "particle {} is not finite: {:?}", i, p);
    }
    for i in 0..10 {
        assert_eq!(particles[i].w, 0.0, "top row stays pinned");
        assert!(
            (particles[i].y).abs() < 1e-6,
            "pinned particle {} drifted to {:?}",
            i,
            particles[i]
        );
    }

    let fabric = cloth.fabric();
    let indices = fabric.indices();
    for (k, &rest) in fabric.rest_values().iter().enumerate() {
        let a = particles[indices[2 * k] as usize].truncate();
        let b = particles[indices[2 * k + 1] as usize].truncate();
        let length = (b - a).length();
        let error = (length - rest).abs() / rest;
        assert!(
            error < 0.05,
            "constraint {} length {} vs rest {} ({:.1}% off)",
            k,
            length,
            rest,
            error * 100.0
        );
    }
}

#[test]
fn test_particle_accelerations_are_applied() {
    let mut cloth = loose_particles(&[Vec3::ZERO, Vec3::ONE]);
    cloth.particle_accelerations_mut()[1] = Vec4::new(0.0, 0.0, -10.0, 0.0);

    let cloth = simulate(cloth, FRAME, 1);

    assert_eq!(cloth.current_particles()[0].truncate(), Vec3::ZERO);
    let p = cloth.current_particles()[1];
    assert!(p.z < 1.0, "accelerated particle did not move: {:?}", p);
    assert_eq!((p.x, p.y), (1.0, 1.0));
}

#[test]
fn test_frame_motion_induces_inertia() {
    let mut cloth = loose_particles(&[Vec3::ZERO]);
    cloth.set_translation(Vec3::new(1.0, 0.0, 0.0));

    let cloth = simulate(cloth, FRAME, 1);

    let x = cloth.current_particles()[0].x;
    assert!(x < 0.0, "particle should lag behind the moving frame, x = {}", x);
    assert!(
        (cloth.linear_velocity().x - 60.0).abs() < 1e-2,
        "frame velocity {:?}",
        cloth.linear_velocity()
    );
}

#[test]
fn test_teleport_does_not_induce_inertia() {
    let mut cloth = loose_particles(&[Vec3::ZERO]);
    cloth.teleport(Vec3::new(5.0, 0.0, 0.0));

    let cloth = simulate(cloth, FRAME, 1);

    assert_eq!(cloth.current_particles()[0].truncate(), Vec3::ZERO);
    assert_eq!(cloth.translation(), Vec3::new(5.0, 0.0, 0.0));
}

#[test]
fn test_parameter_getters_return_user_values() {
    let mut cloth = loose_particles(&[Vec3::ZERO]);
    cloth.set_damping(Vec3::new(0.1, 0.2, 0.3)).unwrap();
    cloth.set_drag_coefficient(0.4).unwrap();
    cloth.set_tether_constraint_stiffness(0.5).unwrap();

    let damping = cloth.damping();
    assert!(
        (damping - Vec3::new(0.1, 0.2, 0.3)).abs().max_element() < 1e-6,
        "damping {:?}",
        damping
    );
    assert!((cloth.drag_coefficient() - 0.4).abs() < 1e-6);
    assert!((cloth.tether_constraint_stiffness() - 0.5).abs() < 1e-6);
}

#[test]
fn test_invalid_parameters_are_rejected() {
    let mut cloth = loose_particles(&[Vec3::ZERO]);
    assert!(matches!(
        cloth.set_damping(Vec3::splat(1.5)),
        Err(ClothError::InvalidParameter { .. })
    ));
    assert!(matches!(
        cloth.set_solver_frequency(0.0),
        Err(ClothError::InvalidParameter { .. })
    ));
    assert!(matches!(
        cloth.set_fluid_density(-1.0),
        Err(ClothError::InvalidParameter { .. })
    ));
}

#[test]
fn test_particle_count_must_match_fabric() {
    let fabric = Fabric::new(FabricDesc {
        num_particles: 3,
        ..Default::default()
    })
    .unwrap();
    let result = Cloth::new(fabric, &[Vec4::ZERO; 2]);
    assert!(matches!(
        result,
        Err(ClothError::SizeMismatch {
            expected: 3,
            actual: 2,
            ..
        })
    ));
}

#[test]
fn test_setters_wake_sleeping_cloth() {
    let mut cloth = loose_particles(&[Vec3::ZERO]);
    cloth.set_sleep_after_count(1);
    cloth.put_to_sleep();
    assert!(cloth.is_sleeping());

    cloth.set_wind_velocity(Vec3::X);
    assert!(!cloth.is_sleeping(), "changing wind wakes the cloth");
}

#[test]
fn test_bounds_follow_particles() {
    let mut cloth = loose_particles(&[Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 0.0)]);
    assert_eq!(cloth.bounding_box_center(), Vec3::new(0.0, 1.0, 0.0));
    assert_eq!(cloth.bounding_box_half_extent(), Vec3::new(1.0, 1.0, 0.0));

    cloth.current_particles_mut()[1] = Vec4::new(3.0, 2.0, 0.0, 1.0);
    cloth.previous_particles_mut()[1] = Vec4::new(3.0, 2.0, 0.0, 1.0);
    let cloth = simulate(cloth, FRAME, 1);
    assert_eq!(cloth.bounding_box_center(), Vec3::new(1.0, 1.0, 0.0));
}

/// One free triangle lying in the XZ plane, exposed to wind.
fn wind_triangle() -> Cloth {
    let fabric = Fabric::new(FabricDesc {
        num_particles: 3,
        triangles: vec![0, 1, 2],
        ..Default::default()
    })
    .expect("single triangle fabric is valid");
    let particles = [
        Vec4::new(0.0, 0.0, 0.0, 1.0),
        Vec4::new(1.0, 0.0, 0.0, 1.0),
        Vec4::new(0.0, 0.0, 1.0, 1.0),
    ];
    Cloth::new(fabric, &particles).expect("particle count matches fabric")
}

fn displacements(before: &[Vec4], cloth: &Cloth) -> Vec<Vec3> {
    before
        .iter()
        .zip(cloth.current_particles())
        .map(|(a, b)| (*b - *a).truncate())
        .collect()
}

#[test]
fn test_drag_carries_triangle_along_wind() {
    let mut cloth = wind_triangle();
    cloth.set_drag_coefficient(0.5).unwrap();
    cloth.set_wind_velocity(Vec3::new(0.0, 5.0, 0.0));
    let before = cloth.current_particles().to_vec();

    let cloth = simulate(cloth, FRAME, 30);

    for (i, d) in displacements(&before, &cloth).iter().enumerate() {
        assert!(d.y > 0.1, "vertex {} not carried by the wind: {:?}", i, d);
        assert!(
            d.x.abs() < 1e-4 && d.z.abs() < 1e-4,
            "drag on a face-on triangle is along the wind, vertex {} moved {:?}",
            i,
            d
        );
    }
}

#[test]
fn test_wind_without_coefficients_has_no_effect() {
    let mut cloth = wind_triangle();
    cloth.set_wind_velocity(Vec3::new(0.0, 5.0, 0.0));
    let before = cloth.current_particles().to_vec();

    let cloth = simulate(cloth, FRAME, 10);

    for d in displacements(&before, &cloth) {
        assert!(d.length() < 1e-6, "moved {:?} with zero drag and lift", d);
    }
}

#[test]
fn test_lift_acts_across_oblique_wind() {
    let mut cloth = wind_triangle();
    cloth.set_lift_coefficient(0.5).unwrap();
    let wind = Vec3::new(3.0, 3.0, 0.0);
    cloth.set_wind_velocity(wind);
    let before = cloth.current_particles().to_vec();

    let cloth = simulate(cloth, FRAME, 30);

    let along = wind.normalize();
    for (i, d) in displacements(&before, &cloth).iter().enumerate() {
        assert!(d.is_finite(), "vertex {} moved to {:?}", i, d);
        let across = *d - along * d.dot(along);
        assert!(
            across.length() > 1e-2,
            "lift should move vertex {} across the wind, moved {:?}",
            i,
            d
        );
    }
}

/// A pinned anchor at the origin with one particle tethered one unit below.
fn tethered_pair(stiffness: f32) -> Cloth {
    let fabric = Fabric::new(FabricDesc {
        num_particles: 2,
        anchors: vec![0, 0],
        tether_lengths: vec![0.0, 1.0],
        ..Default::default()
    })
    .expect("tethered fabric is valid");
    let mut cloth = Cloth::new(
        fabric,
        &[Vec4::new(0.0, 0.0, 0.0, 0.0), Vec4::new(0.0, -1.0, 0.0, 1.0)],
    )
    .expect("particle count matches fabric");
    cloth.set_gravity(Vec3::new(0.0, -9.81, 0.0));
    cloth.set_tether_constraint_stiffness(stiffness).unwrap();
    cloth
}

#[test]
fn test_tether_holds_particle_at_its_length() {
    let cloth = simulate(tethered_pair(1.0), FRAME, 120);

    let anchor = cloth.current_particles()[0];
    assert_eq!(anchor.truncate(), Vec3::ZERO);
    let p = cloth.current_particles()[1];
    assert!((p.y + 1.0).abs() < 1e-3, "tethered particle at {:?}", p);
}

#[test]
fn test_slack_tether_lets_particle_fall() {
    let cloth = simulate(tethered_pair(0.0), FRAME, 120);

    let p = cloth.current_particles()[1];
    assert!(p.y < -5.0, "particle should fall freely, at {:?}", p);
}

#[test]
fn test_tether_scale_shortens_tethers() {
    let mut cloth = tethered_pair(1.0);
    cloth.set_tether_constraint_scale(0.5);
    cloth.current_particles_mut()[1] = Vec4::new(0.0, -0.5, 0.0, 1.0);
    cloth.previous_particles_mut()[1] = Vec4::new(0.0, -0.5, 0.0, 1.0);

    let cloth = simulate(cloth, FRAME, 120);

    let p = cloth.current_particles()[1];
    assert!((p.y + 0.5).abs() < 1e-3, "scaled tether should hold at 0.5, at {:?}", p);
}

#[test]
fn test_rotating_frame_leaves_particle_fixed_in_world() {
    let mut cloth = loose_particles(&[Vec3::new(1.0, 0.0, 0.0)]);
    assert_eq!(cloth.angular_inertia(), Vec3::ONE);
    assert_eq!(cloth.centrifugal_inertia(), Vec3::ONE);
    cloth.set_rotation(Quat::from_rotation_y(1.0));

    let cloth = simulate(cloth, FRAME, 10);

    let local = cloth.current_particles()[0].truncate();
    let world = cloth.rotation() * local;
    assert!(
        (world - Vec3::new(1.0, 0.0, 0.0)).length() < 5e-3,
        "particle moved in world space to {:?} (local {:?})",
        world,
        local
    );
    assert!(
        (local.length() - 1.0).abs() < 1e-3,
        "rotation changed the radius to {}",
        local.length()
    );
}

#[test]
fn test_rotating_frame_without_inertia_carries_particle() {
    let mut cloth = loose_particles(&[Vec3::new(1.0, 0.0, 0.0)]);
    cloth.set_angular_inertia(Vec3::ZERO);
    cloth.set_centrifugal_inertia(Vec3::ZERO);
    cloth.set_rotation(Quat::from_rotation_y(1.0));

    let cloth = simulate(cloth, FRAME, 10);

    let local = cloth.current_particles()[0].truncate();
    assert!(
        (local - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-3,
        "particle should stay put in the local frame, at {:?}",
        local
    );
}
