//! Events, scripts and frame loop tests
//!
//! Tests for:
//! - Event queueing and dispatch
//! - Script hook order
//! - Scripts reading input and emitting events
//! - Engine tick without a GPU
//! - Shutdown of scenes sharing scripts

use std::cell::RefCell;
use std::rc::Rc;

use aether::app::{ButtonState, ScriptEnv};
use aether::scene::TransformProps;
use aether::{
    AssetManager, Engine, EntityKey, EventManager, FrameStatus, InputManager, Key, Scene,
    ScriptComponent, ScriptContext, ScriptExecutor, TransformComponent, World,
};
use glam::Vec3;
use rustc_hash::FxHashSet;

type Log = Rc<RefCell<Vec<String>>>;

/// Records every hook it receives.
struct Recorder {
    log: Log,
}

impl aether::Script for Recorder {
    fn name(&self) -> &str {
        "Recorder"
    }

    fn on_create(&mut self, _entity: EntityKey) {
        self.log.borrow_mut().push("create".into());
    }

    fn on_init(&mut self, _ctx: &mut ScriptContext<'_>) {
        self.log.borrow_mut().push("init".into());
    }

    fn on_update(&mut self, ctx: &mut ScriptContext<'_>) {
        self.log.borrow_mut().push(format!("update {}", ctx.dt));
    }

    fn on_destroy(&mut self, _ctx: &mut ScriptContext<'_>) {
        self.log.borrow_mut().push("destroy".into());
    }
}

/// Moves its entity along +X while Space is held and reports each step.
struct Mover;

struct Moved(f32);

impl aether::Script for Mover {
    fn on_update(&mut self, ctx: &mut ScriptContext<'_>) {
        if !ctx.input.key(Key::Space) {
            return;
        }
        let dt = ctx.dt;
        if let Some(transform) = ctx.transform_mut() {
            transform.props.position.x += dt;
            let x = transform.props.position.x;
            ctx.events.emit(Moved(x));
        }
    }
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn events_wait_for_process() {
    let mut events = EventManager::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let id = events.subscribe(move |e: &Moved| sink.borrow_mut().push(e.0));

    events.emit(Moved(1.0));
    events.emit(Moved(2.0));
    assert_eq!(events.pending(), 2);
    assert!(seen.borrow().is_empty());

    assert_eq!(events.process(), 2);
    assert_eq!(*seen.borrow(), vec![1.0, 2.0]);

    events.unsubscribe(id);
    events.emit(Moved(3.0));
    events.process();
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn every_subscriber_sees_the_event() {
    let mut events = EventManager::new();
    let count = Rc::new(RefCell::new(0));
    for _ in 0..3 {
        let sink = count.clone();
        events.subscribe(move |_: &Moved| *sink.borrow_mut() += 1);
    }
    events.emit(Moved(0.0));
    events.process();
    assert_eq!(*count.borrow(), 3);
}

// ============================================================================
// Scripts
// ============================================================================

#[test]
fn hooks_run_in_lifecycle_order() {
    let log: Log = Rc::default();
    let mut world = World::new();
    let mut scene = Scene::new("s", "S");
    let e = scene.create_entity(&mut world, "e", TransformProps::default()).unwrap();

    let component = ScriptComponent::new().with(Recorder { log: log.clone() });
    assert!(log.borrow().is_empty());
    world.add_component(e, component).unwrap();
    assert_eq!(*log.borrow(), vec!["create"]);

    let input = InputManager::new();
    let mut events = EventManager::new();
    let assets = AssetManager::new();
    let mut executor = ScriptExecutor::new();
    let mut env = ScriptEnv {
        input: &input,
        events: &mut events,
        assets: &assets,
        time: 0.0,
        dt: 0.5,
    };

    assert_eq!(executor.run(&mut world, &scene, &mut env), 1);
    assert_eq!(executor.run(&mut world, &scene, &mut env), 1);
    let mut destroyed = FxHashSet::default();
    assert_eq!(executor.destroy_scene(&mut world, &scene, &mut env, &mut destroyed), 1);
    // Already destroyed through this set.
    assert_eq!(executor.destroy_scene(&mut world, &scene, &mut env, &mut destroyed), 0);

    assert_eq!(*log.borrow(), vec!["create", "init", "update 0.5", "destroy"]);
    assert_eq!(executor.frames(), 2);
}

#[test]
fn script_added_to_attached_component_is_created_immediately() {
    let log: Log = Rc::default();
    let mut world = World::new();
    let mut scene = Scene::new("s", "S");
    let e = scene.create_entity(&mut world, "e", TransformProps::default()).unwrap();
    world.add_component(e, ScriptComponent::new()).unwrap();

    world
        .get_component_mut::<ScriptComponent>(e)
        .unwrap()
        .add(Recorder { log: log.clone() });

    assert_eq!(*log.borrow(), vec!["create"]);
    let names: Vec<_> = world.get_component::<ScriptComponent>(e).unwrap().names().collect();
    assert_eq!(names, vec!["Recorder"]);
}

// ============================================================================
// Engine tick
// ============================================================================

#[test]
fn tick_without_active_scene_does_nothing() {
    let mut engine = Engine::default();
    assert_eq!(engine.tick(0.016).unwrap(), FrameStatus::NoActiveScene);
    assert_eq!(engine.frame_count(), 1);
}

#[test]
fn tick_without_gpu_still_runs_scripts_and_transforms() {
    let mut engine = Engine::default();
    let scene = engine.scene_manager.create_scene("main", "Main");
    let root = scene
        .create_entity(&mut engine.world, "root", TransformProps::from_position(Vec3::Y))
        .unwrap();
    let root_transform = engine.world.component_key::<TransformComponent>(root);
    let mover = scene
        .create_entity(&mut engine.world, "mover", TransformProps::default().with_parent(root_transform))
        .unwrap();
    engine
        .world
        .add_component(mover, ScriptComponent::new().with(Mover))
        .unwrap();
    engine.scene_manager.set_active_scene("main").unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    engine.events.subscribe(move |e: &Moved| sink.borrow_mut().push(e.0));

    // First frame only initializes the script.
    engine.input.inject_key(Key::Space, ButtonState::Pressed);
    assert_eq!(engine.tick(1.0).unwrap(), FrameStatus::NoTarget);
    assert_eq!(engine.tick(1.0).unwrap(), FrameStatus::NoTarget);

    let global = engine
        .world
        .get_component::<TransformComponent>(mover)
        .unwrap()
        .world_position();
    assert!((global - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);

    // Emitted during the second tick, delivered at the start of the third.
    assert!(seen.borrow().is_empty());
    engine.input.inject_key(Key::Space, ButtonState::Released);
    engine.tick(1.0).unwrap();
    assert_eq!(*seen.borrow(), vec![1.0]);
    assert!((engine.time() - 3.0).abs() < 1e-5);
}

#[test]
fn shutdown_destroys_scripts_of_every_scene() {
    let log: Log = Rc::default();
    let mut engine = Engine::default();
    for id in ["a", "b"] {
        let scene = engine.scene_manager.create_scene(id, id);
        let e = scene
            .create_entity(&mut engine.world, "e", TransformProps::default())
            .unwrap();
        engine
            .world
            .add_component(e, ScriptComponent::new().with(Recorder { log: log.clone() }))
            .unwrap();
    }

    engine.shutdown();
    let destroyed = log.borrow().iter().filter(|entry| *entry == "destroy").count();
    assert_eq!(destroyed, 2);
}

#[test]
fn shutdown_destroys_instanced_scripts_once() {
    let log: Log = Rc::default();
    let mut engine = Engine::default();
    let game = engine.scene_manager.create_scene("game", "Game");
    let player = game
        .create_entity(&mut engine.world, "player", TransformProps::default())
        .unwrap();
    engine
        .world
        .add_component(player, ScriptComponent::new().with(Recorder { log: log.clone() }))
        .unwrap();
    let game = game.clone();

    engine.scene_manager.create_scene("editor", "Editor");
    engine
        .scene_manager
        .instance_scene(&mut engine.world, &game, "editor", None)
        .unwrap();

    engine.shutdown();
    let destroyed = log.borrow().iter().filter(|entry| *entry == "destroy").count();
    assert_eq!(destroyed, 1);
}
