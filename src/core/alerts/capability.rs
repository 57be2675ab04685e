// Platform capability probe, consulted once at startup to pick a backend.

use super::model::BackendKind;

/// Host-provided predicate: is a persistent native alert service reachable?
pub trait CapabilityProbe {
    fn is_native_platform(&self) -> bool;
}

/// Compile-target probe: browsers get the web backend, everything else native.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe;

impl CapabilityProbe for HostProbe {
    fn is_native_platform(&self) -> bool {
        !cfg!(target_arch = "wasm32")
    }
}

impl<F> CapabilityProbe for F
where
    F: Fn() -> bool,
{
    fn is_native_platform(&self) -> bool {
        self()
    }
}

pub fn select_backend_kind(probe: &dyn CapabilityProbe) -> BackendKind {
    if probe.is_native_platform() {
        BackendKind::Native
    } else {
        BackendKind::Web
    }
}
