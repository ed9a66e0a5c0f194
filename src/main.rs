//! Headless demo: a player walks past a wall while the camera follows
//!
//! Pass a RON config path as the first argument to override the defaults.

use scene_rig::prelude::*;

const FRAMES: usize = 180;
const DT: f64 = 1.0 / 60.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading config from {path}");
            RigConfig::load_ron(path)?
        }
        None => RigConfig::default(),
    };

    let mut world = World::with_max_depth(config.max_hierarchy_depth);
    let player = world.spawn_with_transform((Name::new("Player"),), Transform::new(), None)?;
    let head = world.spawn_with_transform(
        (Name::new("Head"),),
        Transform::from_position(DVec3::new(0.0, 0.5, 0.0)),
        Some(player),
    )?;

    let mut physics = PhysicsWorld::new();
    let wall = physics.create_static_body(DVec3::new(0.0, 1.0, 4.0), DQuat::IDENTITY);
    physics.add_box_collider(wall, DVec3::new(1.5, 2.0, 0.25), None);
    physics.refresh_queries();

    let mut controller = ThirdPersonController::new(head, &config.controller, config.spring);
    let mut camera = Camera::new();
    camera.set_aspect(1280, 720);

    for frame in 0..FRAMES {
        // Walk along +X, passing behind the wall halfway through
        let x = -4.0 + 8.0 * frame as f64 / FRAMES as f64;
        world.set_local(player, Transform::from_position(DVec3::new(x, 0.0, 0.0)))?;
        controller.rotate(0.0, 0.5);

        controller.update(&mut world, &physics, &mut camera, DT)?;

        if frame % 30 == 0 {
            log::info!(
                "frame {frame:3}: eye ({:.2}, {:.2}, {:.2}) arm {:.2}{}",
                camera.eye.x,
                camera.eye.y,
                camera.eye.z,
                controller.rig().current_distance(),
                if controller.rig().last_obstruction() { " [obstructed]" } else { "" }
            );
        }
    }

    let scene = SceneSnapshot::capture("demo", &world);
    log::info!("Captured {} entities", scene.entity_count());

    Ok(())
}
