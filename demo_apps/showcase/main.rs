//! Showcase
//!
//! A spinning cube on a floor, lit by a shadow-casting sun and a point lamp
//! marked with a billboard. Hold the arrow keys to orbit the camera.

mod input_adapter;

use std::sync::Arc;
use std::time::Instant;

use aether::assets::{
    BufferTarget, IndexAccessor, MeshDescriptor, NodeDescription, PbrMaterialProps,
    PrimitiveDescription, SceneDescription, UnlitMaterialProps, VertexAccessor, VertexAttribute,
    build_scene,
};
use aether::{
    BillboardComponent, CameraProps, Engine, FrameStatus, Key, LightProps, MaterialProps,
    RendererSettings, Script, ScriptComponent, ScriptContext,
};
use glam::{EulerRot, Quat, Vec3, Vec4};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

// ============================================================================
// Scripts
// ============================================================================

struct Spin {
    speed: f32,
}

impl Script for Spin {
    fn on_update(&mut self, ctx: &mut ScriptContext<'_>) {
        let angle = self.speed * ctx.dt;
        if let Some(transform) = ctx.transform_mut() {
            transform.props.rotation = Quat::from_rotation_y(angle) * transform.props.rotation;
        }
    }
}

/// Orbits the entity around the origin with the arrow keys.
struct Orbit {
    yaw: f32,
    pitch: f32,
    distance: f32,
}

impl Script for Orbit {
    fn on_update(&mut self, ctx: &mut ScriptContext<'_>) {
        const SPEED: f32 = 1.5;
        let step = SPEED * ctx.dt;
        if ctx.input.key(Key::ArrowLeft) {
            self.yaw -= step;
        }
        if ctx.input.key(Key::ArrowRight) {
            self.yaw += step;
        }
        if ctx.input.key(Key::ArrowUp) {
            self.pitch = (self.pitch - step).max(-1.4);
        }
        if ctx.input.key(Key::ArrowDown) {
            self.pitch = (self.pitch + step).min(-0.05);
        }
        self.distance = (self.distance - ctx.input.scroll_delta().y * 0.5).clamp(2.0, 30.0);

        let rotation = Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0);
        if let Some(transform) = ctx.transform_mut() {
            transform.props.rotation = rotation;
            transform.props.position = rotation * Vec3::new(0.0, 0.0, self.distance);
        }
    }
}

// ============================================================================
// Scene
// ============================================================================

/// Unit cube with one quad per face so normals and tangents stay flat.
fn register_cube(engine: &mut Engine) -> anyhow::Result<()> {
    const FACES: [(Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_X, Vec3::Z),
        (Vec3::Y, Vec3::X),
        (Vec3::NEG_Y, Vec3::X),
        (Vec3::Z, Vec3::X),
        (Vec3::NEG_Z, Vec3::NEG_X),
    ];
    const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(24);
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(24);
    let mut tangents: Vec<[f32; 4]> = Vec::with_capacity(24);
    let mut uvs: Vec<[f32; 2]> = Vec::with_capacity(24);
    let mut indices: Vec<u16> = Vec::with_capacity(36);

    for (normal, tangent) in FACES {
        let bitangent = normal.cross(tangent);
        let base = positions.len() as u16;
        for (u, v) in CORNERS {
            let p = (normal + tangent * u + bitangent * v) * 0.5;
            positions.push(p.to_array());
            normals.push(normal.to_array());
            tangents.push(tangent.extend(1.0).to_array());
            uvs.push([(u + 1.0) * 0.5, (1.0 - v) * 0.5]);
        }
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    let assets = &mut engine.assets;
    assets.register_buffer("cube/positions", bytemuck::cast_slice(&positions).to_vec(), BufferTarget::Vertex, None);
    assets.register_buffer("cube/normals", bytemuck::cast_slice(&normals).to_vec(), BufferTarget::Vertex, None);
    assets.register_buffer("cube/tangents", bytemuck::cast_slice(&tangents).to_vec(), BufferTarget::Vertex, None);
    assets.register_buffer("cube/uvs", bytemuck::cast_slice(&uvs).to_vec(), BufferTarget::Vertex, None);
    assets.register_buffer("cube/indices", bytemuck::cast_slice(&indices).to_vec(), BufferTarget::Index, None);

    let stream = |buffer: &str, attribute| VertexAccessor {
        buffer: buffer.to_string(),
        attribute,
        byte_offset: 0,
        count: 24,
    };
    assets.register_mesh(
        "cube",
        &MeshDescriptor {
            index: Some(IndexAccessor {
                buffer: "cube/indices".to_string(),
                format: aether::wgpu::IndexFormat::Uint16,
                byte_offset: 0,
                count: 36,
            }),
            attributes: vec![
                stream("cube/positions", VertexAttribute::Position),
                stream("cube/normals", VertexAttribute::Normal),
                stream("cube/tangents", VertexAttribute::Tangent),
                stream("cube/uvs", VertexAttribute::TexCoord0),
            ],
        },
        Some("Cube"),
    )?;
    Ok(())
}

fn register_materials(engine: &mut Engine) {
    let assets = &mut engine.assets;
    assets.register_material(
        "copper",
        MaterialProps::Pbr(PbrMaterialProps {
            albedo_factor: Vec4::new(0.95, 0.64, 0.54, 1.0),
            roughness_factor: 0.35,
            metallic_factor: 1.0,
            ..PbrMaterialProps::default()
        }),
        Some("Copper"),
    );
    assets.register_material(
        "floor",
        MaterialProps::Pbr(PbrMaterialProps {
            albedo_factor: Vec4::new(0.6, 0.6, 0.6, 1.0),
            roughness_factor: 0.9,
            metallic_factor: 0.0,
            ..PbrMaterialProps::default()
        }),
        Some("Floor"),
    );
    assets.register_material(
        "glow",
        MaterialProps::Unlit(UnlitMaterialProps {
            color_factor: Vec4::new(0.3, 0.9, 1.0, 1.0),
            color_texture: None,
        }),
        Some("Glow"),
    );
}

fn build_showcase(engine: &mut Engine) -> anyhow::Result<()> {
    register_cube(engine)?;
    register_materials(engine);

    let description = SceneDescription {
        id: "showcase".into(),
        name: "Showcase".into(),
        nodes: vec![
            NodeDescription {
                camera: Some(CameraProps::default()),
                ..NodeDescription::named("camera")
            },
            NodeDescription {
                rotation: Quat::from_euler(EulerRot::YXZ, 0.6, -0.9, 0.0),
                light: Some(LightProps::sun(Vec3::new(1.0, 0.96, 0.9), 3.0).with_shadow()),
                shadow_map: Some(2048),
                ..NodeDescription::named("sun")
            },
            NodeDescription {
                position: Vec3::new(2.0, 2.0, 1.5),
                light: Some(LightProps::point(Vec3::new(1.0, 0.7, 0.4), 40.0)),
                ..NodeDescription::named("lamp")
            },
            NodeDescription {
                position: Vec3::new(0.0, -0.55, 0.0),
                scale: Vec3::new(12.0, 0.1, 12.0),
                primitives: vec![PrimitiveDescription::new("cube", "floor")],
                ..NodeDescription::named("floor")
            },
            NodeDescription {
                primitives: vec![PrimitiveDescription::new("cube", "copper")],
                children: vec![5],
                ..NodeDescription::named("cube")
            },
            NodeDescription {
                position: Vec3::new(1.2, 0.6, 0.0),
                scale: Vec3::splat(0.2),
                primitives: vec![PrimitiveDescription::new("cube", "glow")],
                ..NodeDescription::named("satellite")
            },
        ],
        roots: vec![],
    };

    build_scene(&mut engine.world, &mut engine.scene_manager, &engine.assets, &description)?;

    let scene = engine.scene_manager.get_scene("showcase")?;
    let camera = scene.get_entity("camera")?;
    let cube = scene.get_entity("cube")?;
    let lamp = scene.get_entity("lamp")?;

    engine.world.add_component(
        camera,
        ScriptComponent::new().with(Orbit {
            yaw: 0.0,
            pitch: -0.35,
            distance: 7.0,
        }),
    )?;
    engine
        .world
        .add_component(cube, ScriptComponent::new().with(Spin { speed: 0.8 }))?;
    engine
        .world
        .add_component(lamp, BillboardComponent::new(engine.assets.texture("white")))?;

    engine.scene_manager.set_active_scene("showcase")?;
    if let Some(scene) = engine.scene_manager.active_scene_mut() {
        scene.set_active_camera(&engine.world, "camera")?;
    }
    Ok(())
}

// ============================================================================
// Host
// ============================================================================

struct Showcase {
    window: Option<Arc<Window>>,
    engine: Option<Engine>,
    last_frame: Instant,
}

impl Showcase {
    fn new() -> Self {
        Self {
            window: None,
            engine: None,
            last_frame: Instant::now(),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let attributes = Window::default_attributes()
            .with_title("Aether Showcase")
            .with_inner_size(winit::dpi::LogicalSize::new(1280.0, 720.0));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();

        log::info!("Initializing renderer...");
        let mut engine = Engine::new(RendererSettings::default());
        pollster::block_on(engine.init_with_window(window.clone(), size.width, size.height))?;
        build_showcase(&mut engine)?;

        self.window = Some(window);
        self.engine = Some(engine);
        self.last_frame = Instant::now();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(engine) = &mut self.engine else {
            return;
        };
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        match engine.tick(dt) {
            Ok(FrameStatus::Rendered) => {}
            Ok(status) => log::debug!("Frame skipped: {status:?}"),
            Err(e) => {
                log::error!("Frame failed: {e}");
                event_loop.exit();
            }
        }
    }
}

impl ApplicationHandler for Showcase {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            log::error!("Fatal error during startup: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let Some(engine) = &mut self.engine {
            input_adapter::process_window_event(&mut engine.input, &event);
        }

        match event {
            WindowEvent::CloseRequested => {
                if let Some(engine) = &mut self.engine {
                    engine.shutdown();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(engine) = &mut self.engine {
                    engine.resize_render_target(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run_app(&mut Showcase::new())?;
    Ok(())
}
