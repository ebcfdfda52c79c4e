//! Frame-loop services shared by the engine and scripts.
//!
//! - [`input`]: platform-agnostic keyboard and mouse state
//! - [`events`]: typed publish/subscribe bus, drained once per frame
//! - [`scripts`]: runs [`Script`](crate::scene::Script) hooks of the active scene

pub mod events;
pub mod input;
pub mod scripts;

pub use events::{EventManager, SubscriptionId};
pub use input::{ButtonState, InputManager, Key, MouseButton};
pub use scripts::{ScriptEnv, ScriptExecutor};
