//! Demo scene: a skybox, sprites, a mesh and a light circling them

use frameforge::prelude::*;

#[derive(Default)]
struct Showcase {
    lamp: Option<EntityId>,
    spinner: Option<EntityId>,
}

impl Application for Showcase {
    fn load_resources(&mut self, ctx: &mut EngineContext) -> Result<(), EngineError> {
        // everything below falls back to the default texture when missing
        for name in ["DefaultSky", "crate"] {
            if let Err(e) = ctx.load::<Texture>(name) {
                log::warn!("{e}");
            }
        }
        Ok(())
    }

    fn on_start(&mut self, ctx: &mut EngineContext) {
        if let Some(camera) = ctx.scene.get_component_by_name_mut::<Camera>(MAIN_CAMERA_NAME) {
            camera.projection_mode = Projection::Perspective;
            camera.controls = true;
        }
        if let Some(camera) = ctx.scene.get_object_by_name(MAIN_CAMERA_NAME) {
            camera
                .transform()
                .borrow_mut()
                .set_position(Vec3::new(0.0, 1.5, -8.0));
        }

        let spawned = [
            Entity::new("Sky").with_component(Skybox::new()),
            Entity::new("Ambient").with_component(Light::ambient().with_strength(0.2)),
            Entity::new("Sun")
                .with_position(Vec3::new(0.0, 10.0, 0.0))
                .with_component(Light::directional().with_strength(0.6)),
            Entity::new("Crate")
                .with_position(Vec3::new(-2.0, 0.0, 0.0))
                .with_component(StaticMesh::new("cube").with_texture("crate")),
            Entity::new("Sprite")
                .with_position(Vec3::new(2.0, 0.0, 0.0))
                .with_component(Sprite::new().with_texture("crate")),
            Entity::new("Lamp")
                .with_position(Vec3::new(0.0, 2.0, -2.0))
                .with_component(Light::point().with_color(Vec3::new(1.0, 0.8, 0.5))),
        ]
        .into_iter()
        .map(|entity| ctx.spawn(entity))
        .collect::<Result<Vec<_>, _>>();

        match spawned {
            Ok(ids) => {
                self.spinner = ids.get(4).copied();
                self.lamp = ids.last().copied();
            }
            Err(e) => log::error!("failed to build the demo scene: {e}"),
        }
    }

    fn on_update(&mut self, ctx: &mut EngineContext, dt: f32) {
        let t = ctx.time.elapsed_seconds();
        if let Some(lamp) = self.lamp.and_then(|id| ctx.scene.get(id)) {
            lamp.transform()
                .borrow_mut()
                .set_position(Vec3::new(t.cos() * 4.0, 2.0, t.sin() * 4.0));
        }
        if let Some(spinner) = self.spinner.and_then(|id| ctx.scene.get(id)) {
            spinner.transform().borrow_mut().rotate(Vec3::new(0.0, 0.0, 45.0 * dt));
        }
        if ctx.input.is_key_just_pressed(KeyCode::KeyL)
            && let Some(lamp) = self.lamp
        {
            let enabled = ctx.scene.get(lamp).is_some_and(|e| e.is_enabled());
            ctx.set_enabled(lamp, !enabled);
        }
    }

    fn on_close(&mut self, ctx: &mut EngineContext) {
        log::info!("{}", ctx.stats.summary());
    }
}

fn main() -> Result<(), EngineError> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_ron(path)?,
        None => EngineConfig::default().with_title("FrameForge Demo"),
    };
    Engine::new(config, Showcase::default()).run()
}
