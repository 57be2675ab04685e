#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
// The ultimate strictness: catches things like missing documentation or overflow risks
#![warn(clippy::restriction)]
pub mod core;

#[cfg(feature = "desktop")]
pub mod app;
#[cfg(feature = "desktop")]
pub use app::run;
