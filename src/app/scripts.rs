use rustc_hash::FxHashSet;

use crate::app::events::EventManager;
use crate::app::input::InputManager;
use crate::assets::manager::AssetManager;
use crate::scene::script::ScriptSlot;
use crate::scene::{ComponentType, Scene, ScriptComponent, ScriptContext, ScriptKey, World};

/// Engine state lent to scripts for one executor call.
pub struct ScriptEnv<'a> {
    pub input: &'a InputManager,
    pub events: &'a mut EventManager,
    pub assets: &'a AssetManager,
    pub time: f32,
    pub dt: f32,
}

/// Drives the [`Script`](crate::scene::Script) hooks of one scene.
///
/// While a component's scripts run they are moved out of the world, so a
/// script holding `&mut World` can freely touch any component, including
/// its own entity's Script component (scripts added that way are kept and
/// start on the next frame).
#[derive(Debug, Default)]
pub struct ScriptExecutor {
    frames: u64,
}

impl ScriptExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of [`run`](Self::run) calls so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs `on_init` for scripts that never ran, `on_update` for the rest.
    /// Returns the number of hooks invoked.
    pub fn run(&mut self, world: &mut World, scene: &Scene, env: &mut ScriptEnv<'_>) -> usize {
        self.frames += 1;
        Self::for_each_script(world, scene, env, |_| true, |slot, ctx| {
            if slot.initialized {
                slot.script.on_update(ctx);
            } else {
                slot.script.on_init(ctx);
                slot.initialized = true;
            }
        })
    }

    /// Runs `on_destroy` on every script of `scene`. Scripts stay attached.
    ///
    /// Components already in `destroyed` are skipped and the visited ones are
    /// added, so a component shared by instanced scenes is destroyed once
    /// when the same set is passed for each scene.
    pub fn destroy_scene(
        &mut self,
        world: &mut World,
        scene: &Scene,
        env: &mut ScriptEnv<'_>,
        destroyed: &mut FxHashSet<ScriptKey>,
    ) -> usize {
        Self::for_each_script(
            world,
            scene,
            env,
            |key| destroyed.insert(key),
            |slot, ctx| slot.script.on_destroy(ctx),
        )
    }

    fn for_each_script(
        world: &mut World,
        scene: &Scene,
        env: &mut ScriptEnv<'_>,
        mut admit: impl FnMut(ScriptKey) -> bool,
        mut hook: impl FnMut(&mut ScriptSlot, &mut ScriptContext<'_>),
    ) -> usize {
        let mut invoked = 0;

        for record in scene.get_components(world, &[ComponentType::Script]) {
            let Some(key) = record.components.script.filter(|&key| admit(key)) else {
                continue;
            };
            let Some(mut running) = Self::take_scripts(world, key) else {
                continue;
            };

            let mut ctx = ScriptContext {
                entity: record.entity,
                world: &mut *world,
                scene,
                input: env.input,
                events: &mut *env.events,
                assets: env.assets,
                time: env.time,
                dt: env.dt,
            };
            for slot in &mut running {
                hook(slot, &mut ctx);
                invoked += 1;
            }

            match world.get_mut::<ScriptComponent>(key) {
                Some(component) => {
                    let added = std::mem::replace(&mut component.scripts, running);
                    component.scripts.extend(added);
                }
                None => log::debug!(
                    "Script component of '{}' was removed while running",
                    world.entity_id(record.entity)
                ),
            }
        }

        invoked
    }

    fn take_scripts(world: &mut World, key: ScriptKey) -> Option<Vec<ScriptSlot>> {
        let component = world.get_mut::<ScriptComponent>(key)?;
        Some(std::mem::take(&mut component.scripts))
    }
}
