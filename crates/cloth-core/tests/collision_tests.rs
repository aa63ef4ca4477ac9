use cloth_core::{Cloth, ClothError, ClothSolver, Fabric, FabricDesc, SwSolver, MAX_COLLISION_SHAPES};
use glam::{Vec3, Vec4};

const FRAME: f32 = 1.0 / 60.0;

/// Unconnected unit-mass particles stepped once per frame.
fn single_iteration_particles(positions: &[Vec3]) -> Cloth {
    let fabric = Fabric::new(FabricDesc {
        num_particles: positions.len() as u32,
        ..Default::default()
    })
    .expect("empty fabric is valid");
    let particles: Vec<Vec4> = positions.iter().map(|p| p.extend(1.0)).collect();
    let mut cloth = Cloth::new(fabric, &particles).expect("particle count matches fabric");
    cloth.set_solver_frequency(60.0).unwrap();
    cloth
}

fn simulate(cloth: Cloth, frames: u32) -> Cloth {
    let mut solver = SwSolver::new();
    let id = solver.add_cloth(cloth);
    for _ in 0..frames {
        solver.simulate(FRAME);
    }
    solver.remove_cloth(id).expect("cloth was added")
}

/// A particle moving two units per iteration straight through a sphere of
/// radius 0.5 at the origin.
fn tunnelling_particle(continuous: bool) -> Cloth {
    let mut cloth = single_iteration_particles(&[Vec3::new(-1.0, 0.0, 0.0)]);
    cloth.previous_particles_mut()[0] = Vec4::new(-3.0, 0.0, 0.0, 1.0);
    cloth
        .set_spheres(&[Vec4::new(0.0, 0.0, 0.0, 0.5)], 0, 0)
        .unwrap();
    cloth.enable_continuous_collision(continuous);
    cloth
}

#[test]
fn test_continuous_collision_prevents_tunnelling() {
    let discrete = simulate(tunnelling_particle(false), 1);
    let swept = simulate(tunnelling_particle(true), 1);

    let discrete_x = discrete.current_particles()[0].x;
    let swept_x = swept.current_particles()[0].x;

    assert!(
        discrete_x > 0.5,
        "without continuous collision the particle passes through, x = {}",
        discrete_x
    );
    assert!(
        swept_x <= -0.5 + 1e-3,
        "continuous collision should stop the particle in front of the sphere, x = {}",
        swept_x
    );
}

#[test]
fn test_sphere_pushes_particle_out() {
    let mut cloth = single_iteration_particles(&[Vec3::new(0.2, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0)]);
    cloth
        .set_spheres(&[Vec4::new(0.0, 0.0, 0.0, 0.5)], 0, 0)
        .unwrap();

    let cloth = simulate(cloth, 1);

    let inside = cloth.current_particles()[0];
    assert!((inside.x - 0.5).abs() < 1e-3, "particle not on sphere surface: {:?}", inside);
    assert_eq!(cloth.current_particles()[1].truncate(), Vec3::new(0.0, 2.0, 0.0));
}

#[test]
fn test_contacts_with_overlapping_spheres_are_averaged() {
    let mut cloth = single_iteration_particles(&[Vec3::ZERO]);
    cloth
        .set_spheres(
            &[Vec4::new(-0.1, 0.0, 0.0, 0.5), Vec4::new(0.1, 0.0, 0.0, 0.5)],
            0,
            0,
        )
        .unwrap();

    let cloth = simulate(cloth, 1);

    // the two pushes cancel, so the averaged correction leaves x alone
    let p = cloth.current_particles()[0];
    assert!(p.x.abs() < 1e-4, "averaged contact moved particle to {:?}", p);
}

#[test]
fn test_capsule_pushes_particle_to_cylinder() {
    let mut cloth = single_iteration_particles(&[Vec3::new(0.0, 0.2, 0.0)]);
    cloth
        .set_spheres(
            &[Vec4::new(-1.0, 0.0, 0.0, 0.5), Vec4::new(1.0, 0.0, 0.0, 0.5)],
            0,
            0,
        )
        .unwrap();
    cloth.set_capsules(&[[0, 1]], 0, 0).unwrap();

    let cloth = simulate(cloth, 1);

    let p = cloth.current_particles()[0];
    assert!((p.y - 0.5).abs() < 1e-3, "particle not on capsule surface: {:?}", p);
    assert!(p.x.abs() < 1e-5, "capsule push is radial, got {:?}", p);
}

#[test]
fn test_convex_pushes_out_through_nearest_face() {
    // unit slab |y| < 1, particle nearer the top face
    let mut cloth = single_iteration_particles(&[Vec3::new(0.0, 0.7, 0.0)]);
    cloth
        .set_planes(
            &[Vec4::new(0.0, 1.0, 0.0, -1.0), Vec4::new(0.0, -1.0, 0.0, -1.0)],
            0,
            0,
        )
        .unwrap();
    cloth.set_convexes(&[0b11], 0, 0).unwrap();

    let cloth = simulate(cloth, 1);

    let p = cloth.current_particles()[0];
    assert!((p.y - 1.0).abs() < 1e-4, "particle not on top face: {:?}", p);
}

#[test]
fn test_triangle_pushes_particle_to_front() {
    let mut cloth = single_iteration_particles(&[Vec3::new(0.2, 0.2, -0.1)]);
    // normal of (a, b, c) points along +z
    cloth
        .set_triangles(
            &[Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            0,
            0,
        )
        .unwrap();

    let cloth = simulate(cloth, 1);

    let p = cloth.current_particles()[0];
    assert!(p.z >= -1e-4, "particle still behind the triangle: {:?}", p);
    assert!((p.x - 0.2).abs() < 1e-4 && (p.y - 0.2).abs() < 1e-4, "push is along the normal: {:?}", p);
}

#[test]
fn test_collision_mass_scale_keeps_user_inverse_mass() {
    let mut cloth = single_iteration_particles(&[Vec3::new(0.2, 0.0, 0.0)]);
    cloth
        .set_spheres(&[Vec4::new(0.0, 0.0, 0.0, 0.5)], 0, 0)
        .unwrap();
    cloth.set_collision_mass_scale(1.0);

    let cloth = simulate(cloth, 2);

    assert_eq!(cloth.previous_particles()[0].w, 1.0, "user inverse mass is preserved");
    let w = cloth.current_particles()[0].w;
    assert!(w > 0.0 && w <= 1.0, "scaled inverse mass {}", w);
}

#[test]
fn test_moving_sphere_interpolates_over_frame() {
    let mut cloth = single_iteration_particles(&[Vec3::ZERO]);
    cloth.set_solver_frequency(600.0).unwrap();
    cloth
        .set_spheres(&[Vec4::new(-2.0, 0.0, 0.0, 0.5)], 0, 0)
        .unwrap();
    // second call interpolates from the start value to the new target
    cloth
        .set_spheres(&[Vec4::new(0.0, 0.0, 0.0, 0.5)], 0, 1)
        .unwrap();
    assert_eq!(cloth.spheres().start()[0].x, -2.0);
    assert_eq!(cloth.spheres().target()[0].x, 0.0);

    let cloth = simulate(cloth, 1);

    let p = cloth.current_particles()[0];
    assert!(p.x >= 0.5 - 1e-3, "sphere sweeping through should carry the particle: {:?}", p);
    assert_eq!(cloth.spheres().start()[0].x, 0.0, "targets become start values");
    assert!(cloth.spheres().target().is_empty());
}

#[test]
fn test_too_many_spheres_is_an_error() {
    let mut cloth = single_iteration_particles(&[Vec3::ZERO]);
    let spheres = vec![Vec4::new(0.0, 0.0, 0.0, 0.1); MAX_COLLISION_SHAPES + 1];
    let result = cloth.set_spheres(&spheres, 0, 0);
    assert!(
        matches!(result, Err(ClothError::CapacityExceeded { max: 32, .. })),
        "got {:?}",
        result
    );
    assert_eq!(cloth.num_spheres(), 0);
}

#[test]
fn test_capsule_indices_are_validated() {
    let mut cloth = single_iteration_particles(&[Vec3::ZERO]);
    cloth
        .set_spheres(&[Vec4::new(0.0, 0.0, 0.0, 0.1)], 0, 0)
        .unwrap();
    let result = cloth.set_capsules(&[[0, 1]], 0, 0);
    assert!(
        matches!(result, Err(ClothError::IndexOutOfRange { .. })),
        "got {:?}",
        result
    );
}

#[test]
fn test_removing_sphere_drops_its_capsules() {
    let mut cloth = single_iteration_particles(&[Vec3::ZERO]);
    let spheres = [
        Vec4::new(0.0, 0.0, 0.0, 0.1),
        Vec4::new(1.0, 0.0, 0.0, 0.1),
        Vec4::new(2.0, 0.0, 0.0, 0.1),
    ];
    cloth.set_spheres(&spheres, 0, 0).unwrap();
    cloth.set_capsules(&[[0, 1], [1, 2]], 0, 0).unwrap();

    cloth.set_spheres(&[], 0, 1).unwrap();

    assert_eq!(cloth.num_spheres(), 2);
    assert_eq!(cloth.capsules(), &[[0, 1]], "remaining capsule is renumbered");
}

#[test]
fn test_degenerate_triangles_are_rejected() {
    let mut cloth = single_iteration_particles(&[Vec3::ZERO]);
    let collinear = [Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)];
    let result = cloth.set_triangles(&collinear, 0, 0);
    assert!(
        matches!(result, Err(ClothError::InvalidParameter { .. })),
        "got {:?}",
        result
    );
    let collapsed = [Vec3::ONE; 3];
    assert!(cloth.set_triangles(&collapsed, 0, 0).is_err());
    assert_eq!(cloth.num_triangles(), 0);

    let valid = [Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)];
    assert!(cloth.set_triangles_interpolated(&valid, &collinear).is_err());
    assert_eq!(cloth.num_triangles(), 0);
}

/// Three particles spanning a triangle around a sphere at the origin, with a
/// collision point at the triangle's centroid.
fn triangle_around_sphere(with_centroid: bool) -> Cloth {
    let mut cloth = single_iteration_particles(&[
        Vec3::new(-2.0, 0.1, -1.0),
        Vec3::new(2.0, 0.1, -1.0),
        Vec3::new(0.0, 0.1, 2.0),
    ]);
    cloth
        .set_spheres(&[Vec4::new(0.0, 0.0, 0.0, 0.5)], 0, 0)
        .unwrap();
    if with_centroid {
        cloth
            .set_virtual_particles(&[[0, 1, 2, 0]], &[Vec3::splat(1.0 / 3.0)])
            .unwrap();
    }
    cloth
}

#[test]
fn test_virtual_particle_pushes_triangle_off_sphere() {
    let without = simulate(triangle_around_sphere(false), 1);
    for p in without.current_particles() {
        assert!((p.y - 0.1).abs() < 1e-6, "vertex outside the sphere moved: {:?}", p);
    }

    let cloth = triangle_around_sphere(true);
    assert_eq!(cloth.num_virtual_particles(), 4, "one triplet padded to a batch of four");
    let cloth = simulate(cloth, 1);

    for (i, p) in cloth.current_particles().iter().enumerate() {
        assert!(p.y > 0.45 && p.y < 0.55, "vertex {} at {:?}", i, p);
    }
    let centroid = cloth
        .current_particles()
        .iter()
        .map(|p| p.truncate())
        .sum::<Vec3>()
        / 3.0;
    assert!(
        centroid.length() >= 0.5 - 1e-3,
        "centroid still inside the sphere: {:?}",
        centroid
    );
}

#[test]
fn test_virtual_particle_indices_are_validated() {
    let mut cloth = single_iteration_particles(&[Vec3::ZERO, Vec3::X, Vec3::Y]);
    let out_of_range = cloth.set_virtual_particles(&[[0, 1, 3, 0]], &[Vec3::splat(1.0 / 3.0)]);
    assert!(matches!(out_of_range, Err(ClothError::IndexOutOfRange { .. })));
    let missing_weight = cloth.set_virtual_particles(&[[0, 1, 2, 1]], &[Vec3::splat(1.0 / 3.0)]);
    assert!(matches!(missing_weight, Err(ClothError::IndexOutOfRange { .. })));
    assert_eq!(cloth.num_virtual_particles(), 0);
}
