use std::collections::HashSet;

use cloth_core::fabric::cooker::simple_tethers;
use cloth_core::scratch::estimate_temporary_memory;
use cloth_core::{cook, Cloth, ClothError, Fabric, FabricDesc, MeshDesc, PhaseType};
use glam::{Vec3, Vec4};

fn pinned_grid_mesh(columns: u32, rows: u32, spacing: f32) -> MeshDesc {
    let mut mesh = MeshDesc::grid(columns, rows, spacing);
    mesh.inv_masses = (0..columns * rows)
        .map(|i| if i < columns { 0.0 } else { 1.0 })
        .collect();
    mesh
}

#[test]
fn test_grid_layout() {
    let mesh = MeshDesc::grid(3, 2, 0.5);
    assert_eq!(mesh.points.len(), 6);
    assert_eq!(mesh.quads.len(), 2);
    assert_eq!(mesh.points[4], Vec3::new(0.5, -0.5, 0.0));
    assert!(mesh.particles().iter().all(|p| p.w == 1.0));
}

#[test]
fn test_cooked_grid_has_every_phase_type() {
    let cooked = cook(&pinned_grid_mesh(6, 6, 0.1), Vec3::NEG_Y).unwrap();
    let types: HashSet<PhaseType> = cooked.phase_types.iter().copied().collect();
    for kind in [
        PhaseType::Horizontal,
        PhaseType::Vertical,
        PhaseType::Shearing,
        PhaseType::Bending,
    ] {
        assert!(types.contains(&kind), "missing {:?} phase", kind);
    }
    assert_eq!(cooked.phase_types.len(), cooked.desc.phases.len());
}

#[test]
fn test_phase_sets_are_particle_disjoint() {
    let mesh = pinned_grid_mesh(8, 5, 0.1);
    let particles = mesh.particles();
    let cooked = cook(&mesh, Vec3::NEG_Y).unwrap();
    let fabric = Fabric::new(cooked.desc).unwrap();

    for phase in 0..fabric.num_phases() {
        let mut seen = HashSet::new();
        for c in fabric.phase_range(phase) {
            for &p in &fabric.indices()[2 * c..2 * c + 2] {
                // pinned particles never move, so they may be shared
                if particles[p as usize].w == 0.0 {
                    continue;
                }
                assert!(seen.insert(p), "particle {} twice in phase {}", p, phase);
            }
        }
    }
}

#[test]
fn test_rest_lengths_match_mesh() {
    let mesh = pinned_grid_mesh(5, 5, 0.2);
    let particles = mesh.particles();
    let cooked = cook(&mesh, Vec3::NEG_Y).unwrap();
    let desc = &cooked.desc;

    assert_eq!(desc.indices.len(), desc.rest_values.len() * 2);
    for (pair, &rest) in desc.indices.chunks(2).zip(&desc.rest_values) {
        let d = (particles[pair[1] as usize] - particles[pair[0] as usize])
            .truncate()
            .length();
        assert!((d - rest).abs() < 1e-6);
    }
}

#[test]
fn test_stretch_edges_follow_gravity() {
    let mesh = pinned_grid_mesh(4, 4, 0.1);
    let particles = mesh.particles();
    let cooked = cook(&mesh, Vec3::NEG_Y).unwrap();
    let fabric = Fabric::new(cooked.desc).unwrap();

    for (phase, kind) in cooked.phase_types.iter().enumerate() {
        for c in fabric.phase_range(phase) {
            let a = particles[fabric.indices()[2 * c] as usize];
            let b = particles[fabric.indices()[2 * c + 1] as usize];
            let dir = (b - a).truncate().normalize();
            match kind {
                PhaseType::Vertical => assert!(dir.x.abs() < 1e-6),
                PhaseType::Horizontal => assert!(dir.y.abs() < 1e-6),
                _ => {}
            }
        }
    }
}

#[test]
fn test_tethers_point_to_nearest_pinned_particle() {
    let mesh = pinned_grid_mesh(4, 3, 1.0);
    let particles = mesh.particles();
    let (anchors, lengths) = simple_tethers(&particles);

    assert_eq!(anchors.len(), particles.len());
    for (i, (&anchor, &length)) in anchors.iter().zip(&lengths).enumerate() {
        // pinned row is directly above every column
        assert_eq!(anchor, i as u32 % 4);
        assert!((length - (i / 4) as f32).abs() < 1e-6);
    }
}

#[test]
fn test_no_pinned_particles_means_no_tethers() {
    let particles = MeshDesc::grid(3, 3, 1.0).particles();
    let (anchors, lengths) = simple_tethers(&particles);
    assert!(anchors.is_empty() && lengths.is_empty());
}

#[test]
fn test_cooked_fabric_carries_mesh_triangles() {
    let cooked = cook(&pinned_grid_mesh(3, 3, 1.0), Vec3::NEG_Y).unwrap();
    // four quads, two triangles each
    assert_eq!(cooked.desc.triangles.len(), 4 * 2 * 3);
    let fabric = Fabric::new(cooked.desc).unwrap();
    assert_eq!(fabric.num_triangles(), 8);
    assert_eq!(fabric.num_tethers(), 9);
}

#[test]
fn test_point_stiffness_becomes_constraint_stiffness() {
    let mut mesh = pinned_grid_mesh(3, 3, 1.0);
    mesh.point_stiffness = vec![0.5; 9];
    let cooked = cook(&mesh, Vec3::NEG_Y).unwrap();
    assert_eq!(cooked.desc.stiffness_values.len(), cooked.desc.rest_values.len());
    assert!(cooked.desc.stiffness_values.iter().all(|&s| s == 0.5));
}

#[test]
fn test_cook_rejects_bad_mesh() {
    assert!(matches!(
        cook(&MeshDesc::default(), Vec3::NEG_Y),
        Err(ClothError::InvalidFabric(_))
    ));

    let mut mesh = MeshDesc::grid(2, 2, 1.0);
    mesh.triangles.push([0, 1, 9]);
    assert!(matches!(
        cook(&mesh, Vec3::NEG_Y),
        Err(ClothError::IndexOutOfRange { index: 9, .. })
    ));

    let mut mesh = MeshDesc::grid(2, 2, 1.0);
    mesh.inv_masses = vec![1.0; 3];
    assert!(matches!(cook(&mesh, Vec3::NEG_Y), Err(ClothError::SizeMismatch { .. })));
}

fn two_constraint_desc() -> FabricDesc {
    FabricDesc {
        num_particles: 3,
        phases: vec![0, 1],
        sets: vec![1, 2],
        rest_values: vec![1.0, 1.0],
        indices: vec![0, 1, 1, 2],
        ..Default::default()
    }
}

#[test]
fn test_fabric_accepts_valid_desc() {
    let fabric = Fabric::new(two_constraint_desc()).unwrap();
    assert_eq!(fabric.num_particles(), 3);
    assert_eq!(fabric.num_phases(), 2);
    assert_eq!(fabric.num_sets(), 2);
    assert_eq!(fabric.num_constraints(), 2);
    assert_eq!(fabric.phase_range(1), 1..2);
}

#[test]
fn test_fabric_rejects_malformed_desc() {
    let mut unsorted = two_constraint_desc();
    unsorted.sets = vec![2, 1];
    assert!(matches!(Fabric::new(unsorted), Err(ClothError::InvalidFabric(_))));

    let mut leading_zero = two_constraint_desc();
    leading_zero.sets = vec![0, 2];
    leading_zero.phases = vec![1];
    assert!(matches!(Fabric::new(leading_zero), Err(ClothError::InvalidFabric(_))));

    let mut short_rest = two_constraint_desc();
    short_rest.rest_values.pop();
    assert!(matches!(Fabric::new(short_rest), Err(ClothError::SizeMismatch { .. })));

    let mut bad_index = two_constraint_desc();
    bad_index.indices[3] = 3;
    assert!(matches!(
        Fabric::new(bad_index),
        Err(ClothError::IndexOutOfRange { index: 3, len: 3, .. })
    ));

    let mut bad_phase = two_constraint_desc();
    bad_phase.phases.push(5);
    assert!(matches!(Fabric::new(bad_phase), Err(ClothError::IndexOutOfRange { .. })));

    let mut partial_tethers = two_constraint_desc();
    partial_tethers.anchors = vec![0, 0];
    partial_tethers.tether_lengths = vec![0.0, 1.0];
    assert!(matches!(Fabric::new(partial_tethers), Err(ClothError::InvalidFabric(_))));

    let mut ragged_triangles = two_constraint_desc();
    ragged_triangles.triangles = vec![0, 1];
    assert!(matches!(Fabric::new(ragged_triangles), Err(ClothError::InvalidFabric(_))));
}

#[test]
fn test_fabric_is_shared_between_cloths() {
    let fabric = Fabric::new(two_constraint_desc()).unwrap();
    let particles = [Vec4::new(0.0, 0.0, 0.0, 1.0); 3];
    let a = Cloth::new(fabric.clone(), &particles).unwrap();
    let b = Cloth::new(fabric.clone(), &particles).unwrap();
    assert!(std::sync::Arc::ptr_eq(a.fabric(), b.fabric()));
    drop(a);
    drop(b);
    assert_eq!(std::sync::Arc::strong_count(&fabric), 1);
}

#[test]
fn test_temporary_memory_estimate() {
    let mesh = pinned_grid_mesh(10, 10, 0.1);
    let cooked = cook(&mesh, Vec3::NEG_Y).unwrap();
    let fabric = Fabric::new(cooked.desc).unwrap();
    let mut cloth = Cloth::new(fabric, &mesh.particles()).unwrap();
    assert_eq!(estimate_temporary_memory(&cloth), 0, "nothing to collide with");

    cloth
        .set_spheres(&[Vec4::new(0.0, -0.5, 0.0, 0.2), Vec4::new(0.5, -0.5, 0.0, 0.2)], 0, 0)
        .unwrap();
    cloth.set_capsules(&[[0, 1]], 0, 0).unwrap();
    let shapes = estimate_temporary_memory(&cloth);
    assert!(shapes > 0);

    cloth.set_self_collision_distance(0.05);
    cloth.set_self_collision_stiffness(1.0).unwrap();
    assert!(estimate_temporary_memory(&cloth) > shapes, "self collision needs sort buffers");
}
