// Order alert system: one continuous alert while any order awaits the vendor.
//
// Architecture:
// - model.rs: Requests, states and the backend error taxonomy
// - capability.rs: Startup probe choosing the native or web backend
// - native.rs: Proxy over the platform alert bridge
// - service.rs: Persistent native alert service (own thread, looping sink)
// - unlock.rs: Gesture unlock state for browser autoplay
// - web.rs: Single looping audio element behind the unlock gate
// - dom.rs: Browser bindings for the web backend
// - backend.rs: Backend variant fixed for the process lifetime
// - controller.rs: Active-order set and start/stop dispatch

pub mod backend;
pub mod capability;
pub mod controller;
#[cfg(target_arch = "wasm32")]
pub mod dom;
pub mod model;
pub mod native;
#[cfg(not(target_arch = "wasm32"))]
pub mod service;
pub mod unlock;
pub mod web;
