//! Composition root sharing one controller across UI mount points.
//!
//! [`StudioHost`] holds at most one [`StudioController`] per
//! configuration.  Consumers call [`StudioHost::acquire`] for a
//! reference-counted handle; the controller is constructed on the first
//! acquire and shut down when the last handle is released.  Lifetime is
//! explicit — there is no module-level global.

use std::sync::Arc;

use easel_backend::api::{GenerationBackend, HttpBackend};

use crate::config::StudioConfig;
use crate::controller::StudioController;

/// Owns the shared controller slot for one backend configuration.
pub struct StudioHost {
    config: StudioConfig,
    backend: Arc<dyn GenerationBackend>,
    slot: tokio::sync::Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    controller: Option<Arc<StudioController>>,
    consumers: usize,
}

impl StudioHost {
    /// Host a controller backed by the real HTTP client.
    pub fn new(config: StudioConfig) -> Arc<Self> {
        let backend = Arc::new(HttpBackend::new(config.base_url.clone()));
        Self::with_backend(config, backend)
    }

    /// Host a controller over an explicit backend implementation.
    pub fn with_backend(config: StudioConfig, backend: Arc<dyn GenerationBackend>) -> Arc<Self> {
        Arc::new(Self {
            config,
            backend,
            slot: tokio::sync::Mutex::new(Slot::default()),
        })
    }

    /// Acquire a handle to the shared controller, constructing it on
    /// first use.
    pub async fn acquire(self: &Arc<Self>) -> StudioHandle {
        let mut slot = self.slot.lock().await;
        let controller = match &slot.controller {
            Some(controller) => Arc::clone(controller),
            None => {
                let controller =
                    StudioController::new(self.config.clone(), Arc::clone(&self.backend));
                slot.controller = Some(Arc::clone(&controller));
                controller
            }
        };
        slot.consumers += 1;

        StudioHandle {
            host: Arc::clone(self),
            controller,
            released: false,
        }
    }

    /// Number of outstanding handles.
    pub async fn consumers(&self) -> usize {
        self.slot.lock().await.consumers
    }

    async fn release_one(&self) {
        let mut slot = self.slot.lock().await;
        slot.consumers = slot.consumers.saturating_sub(1);
        if slot.consumers == 0 {
            if let Some(controller) = slot.controller.take() {
                controller.shutdown().await;
            }
        }
    }
}

/// Reference-counted handle to the shared [`StudioController`].
///
/// Prefer the explicit [`StudioHandle::release`]; dropping the handle
/// releases asynchronously on the current runtime.
pub struct StudioHandle {
    host: Arc<StudioHost>,
    controller: Arc<StudioController>,
    released: bool,
}

impl StudioHandle {
    /// The shared controller.
    pub fn controller(&self) -> &Arc<StudioController> {
        &self.controller
    }

    /// Release this handle.  The last release shuts the controller down.
    pub async fn release(mut self) {
        self.released = true;
        let host = Arc::clone(&self.host);
        host.release_one().await;
    }
}

impl std::ops::Deref for StudioHandle {
    type Target = StudioController;

    fn deref(&self) -> &Self::Target {
        &self.controller
    }
}

impl Drop for StudioHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let host = Arc::clone(&self.host);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                host.release_one().await;
            });
        }
    }
}
