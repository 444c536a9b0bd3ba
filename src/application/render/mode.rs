use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Answers "are we in development mode?" once per render call.
///
/// When it answers true, the renderer re-parses the template set before
/// rendering so edits show up without a restart.
pub trait RuntimeMode: Send + Sync {
    fn is_development(&self) -> bool;
}

/// A mode fixed at construction time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedMode(pub bool);

impl RuntimeMode for FixedMode {
    fn is_development(&self) -> bool {
        self.0
    }
}

/// A shared switch that can be flipped while the renderer is serving.
#[derive(Debug, Clone, Default)]
pub struct DevModeSwitch {
    enabled: Arc<AtomicBool>,
}

impl DevModeSwitch {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

impl RuntimeMode for DevModeSwitch {
    fn is_development(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl<F> RuntimeMode for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_development(&self) -> bool {
        self()
    }
}
