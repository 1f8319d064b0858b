//! Picking probe.
//!
//! Builds a grid of cubes, places a camera in front of it, optionally applies
//! orbit and zoom gestures, then casts a ray through one pixel and prints
//! every hit nearest first.
//!
//! Usage: cargo run -p glance-probe -- --grid 4 --x 420 --y 310 --sah

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use cgmath::{Point2, Point3};
use clap::Parser;
use glance::common::{BvhOptions, SplitStrategy};
use glance::scene::{EntityId, Mesh};
use glance::{Camera, ControllerSettings, OrbitCamera, Projection, Scene};

#[derive(Parser)]
#[command(name = "glance-probe")]
#[command(about = "Cast a pick ray into a grid of cubes and report the hits")]
#[command(version)]
struct Cli {
    /// Viewport width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Pointer x in pixels (defaults to the viewport center)
    #[arg(long)]
    x: Option<f32>,

    /// Pointer y in pixels, top-down (defaults to the viewport center)
    #[arg(long)]
    y: Option<f32>,

    /// Cubes per side of the square grid
    #[arg(long, default_value_t = 3)]
    grid: u32,

    /// Distance between neighbouring cube centers
    #[arg(long, default_value_t = 3.0)]
    spacing: f32,

    /// Edge length of each cube
    #[arg(long, default_value_t = 1.0)]
    size: f32,

    /// Camera distance from the grid center along +Z
    #[arg(long, default_value_t = 10.0)]
    distance: f32,

    /// Use an orthographic camera with this half-height
    #[arg(long)]
    ortho: Option<f32>,

    /// Build spatial indices with the surface-area heuristic
    #[arg(long)]
    sah: bool,

    /// Maximum triangles per BVH leaf
    #[arg(long, default_value_t = 4)]
    leaf_size: usize,

    /// Frame the whole grid before applying gestures
    #[arg(long)]
    frame: bool,

    /// Horizontal orbit drag in pixels
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    orbit_dx: f32,

    /// Vertical orbit drag in pixels
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    orbit_dy: f32,

    /// Zoom amount (positive moves closer)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    zoom: f32,

    /// Controller settings as JSON; missing fields keep their defaults
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.width == 0 || cli.height == 0 {
        bail!("Viewport must be at least 1x1 pixels");
    }
    if cli.leaf_size == 0 {
        bail!("Leaf size must be at least 1");
    }

    let settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => ControllerSettings::default(),
    };

    let mut scene = Scene::new();
    build_grid(&mut scene, &cli)?;

    let camera = scene.add_camera(Camera {
        viewport_width: cli.width,
        viewport_height: cli.height,
        projection: match cli.ortho {
            Some(half_height) => Projection::Orthographic { half_height },
            None => Projection::Perspective,
        },
        ..Camera::default()
    });
    let eye = scene.add_camera_entity(
        Some("probe camera".into()),
        camera,
        Point3::new(0.0, 0.0, cli.distance),
    )?;

    let mut orbit = OrbitCamera::new(settings);
    orbit.bind(eye);
    apply_gestures(&mut scene, &mut orbit, &cli);

    let pointer = Point2::new(
        cli.x.unwrap_or(cli.width as f32 * 0.5),
        cli.y.unwrap_or(cli.height as f32 * 0.5),
    );
    let hits = scene.pick(eye, pointer);

    print_stats(&scene, eye);
    println!();
    println!("Pick at ({}, {}): {} hit(s)", pointer.x, pointer.y, hits.len());
    for hit in &hits {
        let name = scene
            .entity(hit.entity)
            .and_then(|e| e.name.as_deref())
            .unwrap_or("<unnamed>");
        println!(
            "  {:<12} distance {:>8.4}  point ({:.3}, {:.3}, {:.3})  triangle {}",
            name,
            hit.distance,
            hit.hit_point.x,
            hit.hit_point.y,
            hit.hit_point.z,
            hit.triangle_index
        );
    }

    Ok(())
}

fn load_settings(path: &Path) -> Result<ControllerSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid settings in {}", path.display()))
}

/// Adds `grid x grid` cubes centered on the origin in the XY plane, all
/// sharing one indexed mesh and parented under a single root node.
fn build_grid(scene: &mut Scene, cli: &Cli) -> Result<()> {
    let options = BvhOptions {
        max_leaf_size: cli.leaf_size,
        strategy: if cli.sah {
            SplitStrategy::SurfaceArea
        } else {
            SplitStrategy::Median
        },
    };

    let mut cube = Mesh::cuboid(cli.size, cli.size, cli.size);
    cube.update_index_with(options)?;
    let mesh = scene.add_mesh(cube);

    let root = scene.transforms.add_node(None)?;
    let offset = (cli.grid.saturating_sub(1)) as f32 * cli.spacing * 0.5;

    for row in 0..cli.grid {
        for col in 0..cli.grid {
            let name = format!("cube[{},{}]", row, col);
            let entity = scene.add_drawable_entity(Some(name), mesh, Some(root))?;
            let node = scene
                .entity(entity)
                .and_then(|e| e.transform)
                .context("Drawable entity without a transform")?;
            if let Some(transform) = scene.transforms.get_mut(node) {
                transform.set_position(Point3::new(
                    col as f32 * cli.spacing - offset,
                    offset - row as f32 * cli.spacing,
                    0.0,
                ));
            }
        }
    }

    scene.update();
    Ok(())
}

fn apply_gestures(scene: &mut Scene, orbit: &mut OrbitCamera, cli: &Cli) {
    if cli.frame {
        match scene.bounding() {
            Some(bounds) => {
                orbit.frame_bounds(scene, &bounds);
            }
            None => log::warn!("Nothing to frame: the grid is empty"),
        }
    }

    if cli.orbit_dx != 0.0 || cli.orbit_dy != 0.0 {
        orbit.start_orbit(0.0, 0.0);
        orbit.orbit(scene, cli.orbit_dx, cli.orbit_dy);
        orbit.stop_orbit();
    }

    if cli.zoom != 0.0 && !orbit.zoom(scene, cli.zoom) {
        log::warn!("Zoom of {} was not applied", cli.zoom);
    }
}

fn print_stats(scene: &Scene, eye: EntityId) {
    let indexed: Vec<_> = scene
        .meshes
        .values()
        .filter_map(|mesh| mesh.spatial_index())
        .collect();

    println!("Scene:");
    println!("  Entities:  {}", scene.entities.len());
    println!("  Meshes:    {}", scene.meshes.len());
    println!("  Nodes:     {}", scene.transforms.len());
    for bvh in indexed {
        println!(
            "  BVH:       {} triangles, {} nodes, depth {}",
            bvh.triangle_count(),
            bvh.node_count(),
            bvh.depth()
        );
    }

    if let Some(world) = scene.world_matrix(eye) {
        println!(
            "  Camera:    ({:.3}, {:.3}, {:.3})",
            world.w.x, world.w.y, world.w.z
        );
    }
}
