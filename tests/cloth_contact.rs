use anyhow::Result;
use clothview::draw::{AxisXyz, ClothSurface, Drawable, Primitive};
use clothview::{Cad2D, ClothConfig, ClothFem, Sdf, SdfSphere};
use std::cell::RefCell;
use std::rc::Rc;

fn demo_scene(elen: f64) -> Result<(Vec<usize>, ClothFem)> {
    let cad = Cad2D::from_flat_xy(&[-1., -1., 1., -1., 1., 1., -1., 1.])?;
    let mesh = cad.mesh(elen)?;
    let mut fem = ClothFem::new(&mesh, ClothConfig::default())?;
    let pinned = cad.points_edge(&[2], mesh.vertices())?;
    fem.fix_points(&pinned)?;
    fem.sdf_mut().push(SdfSphere::new(0.55, [0., 0.5, -1.], true));
    Ok((pinned, fem))
}

#[test]
fn test_demo_mesh_and_pinned_edge() -> Result<()> {
    let cad = Cad2D::from_flat_xy(&[-1., -1., 1., -1., 1., 1., -1., 1.])?;
    let mesh = cad.mesh(0.05)?;
    assert!((mesh.area() - 4.0).abs() < 1e-9);
    assert_eq!(mesh.boundary_edges().len(), 4 * 40);

    let pinned = cad.points_edge(&[2], mesh.vertices())?;
    assert_eq!(pinned.len(), 41);
    for &i in &pinned {
        assert!((mesh.vertices()[i].y - 1.0).abs() < 1e-12);
    }
    assert!(cad.points_edge(&[4], mesh.vertices()).is_err());
    Ok(())
}

#[test]
fn test_pinned_cloth_drapes_over_sphere() -> Result<()> {
    let (pinned, mut fem) = demo_scene(0.1)?;
    let rest = fem.rest_positions();
    for _ in 0..60 {
        fem.step()?;
        let deepest = fem
            .positions()
            .iter()
            .map(|&p| fem.sdf().signed_distance(p))
            .fold(f64::INFINITY, f64::min);
        assert!(deepest > -0.04, "penetration {deepest} at step {}", fem.step_count());
    }
    let x = fem.positions();
    for &i in &pinned {
        assert_eq!(x[i], rest[i]);
    }
    // The free edge has swung down
    let lowest = x.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
    assert!(lowest < -0.3, "lowest z = {lowest}");
    Ok(())
}

#[test]
fn test_scene_items_share_one_simulation() -> Result<()> {
    let (_, fem) = demo_scene(0.25)?;
    let sdf = fem.sdf().clone();
    let fem = Rc::new(RefCell::new(fem));
    let mut items: Vec<Box<dyn Drawable>> = vec![
        Box::new(fem.clone()),
        Box::new(ClothSurface::new(fem.clone())),
        Box::new(AxisXyz::new(1.0)),
        Box::new(sdf),
    ];
    for _ in 0..3 {
        for item in items.iter_mut() {
            item.animate()?;
        }
    }
    // Only the simulation itself advances
    assert_eq!(fem.borrow().step_count(), 3);

    let surface = items[1].primitives();
    let Primitive::Triangles { positions, .. } = &surface[0] else {
        panic!("cloth surface should be triangles");
    };
    assert_eq!(positions, &fem.borrow().positions());
    assert!(matches!(items[3].primitives()[0], Primitive::Sphere { .. }));
    Ok(())
}
