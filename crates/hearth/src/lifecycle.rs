//! Engine lifecycle
//!
//! [`EngineManager`] owns the one loaded engine and decides whether a request
//! can reuse it or needs a reload. All access goes through a single async
//! mutex. Loads and inference calls run on blocking workers that own the lock
//! guard, so the slot stays locked until the blocking work returns even when
//! the future that started it is dropped.

use hearth_core::{
    ChatFormat, CoreError, EngineConfig, EngineLoader, EngineMetadata, InferenceEngine, LoadSpec,
    Message, SamplingParameters, SharedEngine,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info};

use crate::catalog::ModelCatalog;
use crate::error::ChatError;

/// Which configuration changes force a reload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Reload only when the model file or GPU layer count changes
    #[default]
    ModelOrGpuLayers,
    /// Reload when any engine setting changes
    AnyChange,
}

struct LoadedEngine {
    engine: SharedEngine,
    config: EngineConfig,
}

enum EngineSlot {
    Unloaded,
    Loaded(LoadedEngine),
    Failed { model: String, reason: String },
}

/// Snapshot of the engine slot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineStatus {
    Unloaded,
    Loaded {
        model: String,
        model_path: String,
        context_size: u32,
        gpu_layers: u32,
        chat_format: ChatFormat,
        vision: bool,
        backend: EngineMetadata,
    },
    Failed {
        model: String,
        reason: String,
    },
}

impl EngineStatus {
    fn of(slot: &EngineSlot) -> Self {
        match slot {
            EngineSlot::Unloaded => EngineStatus::Unloaded,
            EngineSlot::Loaded(loaded) => EngineStatus::Loaded {
                model: loaded.config.model.clone(),
                model_path: loaded.engine.model_path().display().to_string(),
                context_size: loaded.config.context_size,
                gpu_layers: loaded.engine.gpu_layers(),
                chat_format: loaded.engine.chat_format(),
                vision: loaded.config.vision,
                backend: loaded.engine.metadata(),
            },
            EngineSlot::Failed { model, reason } => EngineStatus::Failed {
                model: model.clone(),
                reason: reason.clone(),
            },
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, EngineStatus::Loaded { .. })
    }
}

/// Everything a lock holder needs besides the slot itself
struct Shared {
    loader: Arc<dyn EngineLoader>,
    catalog: ModelCatalog,
    policy: ReloadPolicy,
    loads: AtomicUsize,
}

/// Owner of the single loaded inference engine
pub struct EngineManager {
    shared: Arc<Shared>,
    slot: Arc<Mutex<EngineSlot>>,
}

impl EngineManager {
    pub fn new(loader: Arc<dyn EngineLoader>, catalog: ModelCatalog, policy: ReloadPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                loader,
                catalog,
                policy,
                loads: AtomicUsize::new(0),
            }),
            slot: Arc::new(Mutex::new(EngineSlot::Unloaded)),
        }
    }

    /// Take exclusive access to the engine slot
    pub async fn lock(&self) -> EngineGuard {
        EngineGuard {
            shared: Arc::clone(&self.shared),
            slot: Arc::clone(&self.slot).lock_owned().await,
        }
    }

    /// Get the engine for `config`, loading or reloading as needed
    pub async fn acquire(&self, config: &EngineConfig) -> Result<SharedEngine, ChatError> {
        Ok(self.lock().await.acquire(config).await?.into_engine())
    }

    pub async fn status(&self) -> EngineStatus {
        self.lock().await.status()
    }

    /// Status without waiting; `None` while a load or turn holds the slot
    pub fn try_status(&self) -> Option<EngineStatus> {
        self.slot.try_lock().ok().map(|slot| EngineStatus::of(&slot))
    }

    /// Number of successful engine constructions so far
    pub fn load_count(&self) -> usize {
        self.shared.loads.load(Ordering::SeqCst)
    }
}

fn needs_reload(
    loaded: &LoadedEngine,
    config: &EngineConfig,
    model_path: &Path,
    policy: ReloadPolicy,
) -> bool {
    let identity_changed = loaded.engine.model_path() != model_path
        || loaded.engine.gpu_layers() != config.gpu_layers;

    match policy {
        ReloadPolicy::ModelOrGpuLayers => identity_changed,
        ReloadPolicy::AnyChange => identity_changed || loaded.config != *config,
    }
}

/// Exclusive access to the engine slot, released on drop
pub struct EngineGuard {
    shared: Arc<Shared>,
    slot: OwnedMutexGuard<EngineSlot>,
}

impl EngineGuard {
    pub fn status(&self) -> EngineStatus {
        EngineStatus::of(&self.slot)
    }

    /// The loaded engine, without touching its configuration
    pub fn current(self) -> Result<LockedEngine, ChatError> {
        let engine = match &*self.slot {
            EngineSlot::Loaded(loaded) => Arc::clone(&loaded.engine),
            EngineSlot::Unloaded => {
                return Err(ChatError::EngineNotReady(
                    "no model is loaded; configure a session first".to_string(),
                ));
            }
            EngineSlot::Failed { model, reason } => {
                return Err(ChatError::EngineNotReady(format!(
                    "no model is loaded; the last attempt to load '{}' failed: {}",
                    model, reason
                )));
            }
        };
        Ok(LockedEngine {
            guard: self,
            engine,
        })
    }

    /// Return the loaded engine if it matches `config` under the manager's
    /// reload policy, otherwise release it and build a new one.
    pub async fn acquire(mut self, config: &EngineConfig) -> Result<LockedEngine, ChatError> {
        config.validate().map_err(|e| ChatError::EngineLoad {
            model: config.model.clone(),
            reason: e.to_string(),
        })?;

        let model_path = self.shared.catalog.resolve(&config.model).await?;

        if let EngineSlot::Loaded(loaded) = &*self.slot {
            if !needs_reload(loaded, config, &model_path, self.shared.policy) {
                if loaded.config != *config {
                    debug!(
                        model = %config.model,
                        loaded_context_size = loaded.config.context_size,
                        requested_context_size = config.context_size,
                        loaded_vision = loaded.config.vision,
                        requested_vision = config.vision,
                        "Reusing loaded engine; context size and vision changes do not reload"
                    );
                }
                let engine = Arc::clone(&loaded.engine);
                return Ok(LockedEngine {
                    guard: self,
                    engine,
                });
            }
        }

        // Until the load finishes the slot reads as a failed load, which is
        // also what remains if the loader panics.
        let interrupted = EngineSlot::Failed {
            model: config.model.clone(),
            reason: "load did not complete".to_string(),
        };
        let previous = match std::mem::replace(&mut *self.slot, interrupted) {
            EngineSlot::Loaded(loaded) => {
                info!(model = %loaded.config.model, "Releasing loaded engine");
                Some(loaded.config.model)
            }
            _ => None,
        };

        let spec = LoadSpec::from_config(config, model_path);
        info!(
            model = %config.model,
            path = %spec.model_path.display(),
            context_size = spec.context_size,
            gpu_layers = spec.gpu_layers,
            chat_format = %spec.chat_format,
            "Loading engine"
        );

        let model = config.model.clone();
        let config = config.clone();
        let mut guard = self;
        tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            let outcome = guard.shared.loader.load(&spec);
            guard
                .finish_load(config, outcome, previous, started)
                .map(|engine| LockedEngine { guard, engine })
        })
        .await
        .map_err(|e| ChatError::EngineLoad {
            model,
            reason: format!("loader task failed: {}", e),
        })?
    }

    fn finish_load(
        &mut self,
        config: EngineConfig,
        outcome: Result<Box<dyn InferenceEngine>, CoreError>,
        previous: Option<String>,
        started: Instant,
    ) -> Result<SharedEngine, ChatError> {
        match outcome {
            Ok(engine) => {
                let engine: SharedEngine = Arc::from(engine);
                self.shared.loads.fetch_add(1, Ordering::SeqCst);
                info!(
                    model = %config.model,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Engine loaded"
                );
                *self.slot = EngineSlot::Loaded(LoadedEngine {
                    engine: Arc::clone(&engine),
                    config,
                });
                Ok(engine)
            }
            Err(e) => {
                let reason = e.to_string();
                error!(model = %config.model, %reason, "Engine load failed");
                *self.slot = EngineSlot::Failed {
                    model: config.model.clone(),
                    reason: reason.clone(),
                };
                let reason = match previous {
                    Some(previous) => format!(
                        "{}; previously loaded model '{}' was released and no model is loaded",
                        reason, previous
                    ),
                    None => reason,
                };
                Err(ChatError::EngineLoad {
                    model: config.model,
                    reason,
                })
            }
        }
    }
}

/// A loaded engine together with the lock on its slot
pub struct LockedEngine {
    guard: EngineGuard,
    engine: SharedEngine,
}

impl LockedEngine {
    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    pub fn status(&self) -> EngineStatus {
        self.guard.status()
    }

    /// Release the lock and keep only the engine handle
    pub fn into_engine(self) -> SharedEngine {
        self.engine
    }

    /// Run `complete` on a blocking worker. The worker owns the lock, so no
    /// reload can start until the call returns. Hands back `messages` with
    /// the reply.
    pub async fn complete(
        self,
        messages: Vec<Message>,
        sampling: SamplingParameters,
    ) -> Result<(Vec<Message>, Message), ChatError> {
        tokio::task::spawn_blocking(move || {
            let reply = self.engine.complete(&messages, &sampling);
            drop(self);
            match reply {
                Ok(reply) => Ok((messages, reply)),
                Err(e) => Err(ChatError::Inference(e.to_string())),
            }
        })
        .await
        .map_err(|e| ChatError::Inference(format!("inference task failed: {}", e)))?
    }
}
