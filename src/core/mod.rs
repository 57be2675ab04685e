pub mod alerts;
pub mod config;
pub mod provider;
pub mod push;
#[cfg(not(target_arch = "wasm32"))]
pub mod runtime;

#[cfg(test)]
mod sim_test;
