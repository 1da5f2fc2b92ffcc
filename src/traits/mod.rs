pub mod hook;

pub use hook::{DefaultHook, Hooks, InstanceHook, InstanceSetup};
