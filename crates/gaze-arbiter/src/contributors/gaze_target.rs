//! Named gaze targets.
//!
//! Operators store points under a name and recall them later. The store is
//! a plain map (last write wins) optionally mirrored to a JSON file; any
//! persistence failure is logged and the in-memory store keeps working.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gaze_models::{FrameId, GazeEvent, GazeTargetCommand, LookCandidate, Point3, PriorityClass, Timestamp, Topic};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{Contributor, SlotBinding};
use crate::config::GazeTargetConfig;
use crate::error::{GazeError, GazeResult};
use crate::registry::ArbitrationRegistry;
use crate::telemetry::{self, ContributorDiagnostics};

/// A stored point and the frame it is expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTarget {
    pub frame: FrameId,
    pub position: Point3,
}

/// Name → target map with optional JSON file backing.
#[derive(Debug, Default)]
pub struct GazeTargetStore {
    targets: HashMap<String, StoredTarget>,
    path: Option<PathBuf>,
}

impl GazeTargetStore {
    /// In-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> GazeResult<Self> {
        let path = path.into();
        let targets = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            targets,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&StoredTarget> {
        self.targets.get(name)
    }

    /// Insert or overwrite.
    pub fn insert(&mut self, name: impl Into<String>, target: StoredTarget) {
        self.targets.insert(name.into(), target);
    }

    pub fn remove(&mut self, name: &str) -> Option<StoredTarget> {
        self.targets.remove(name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Write the store to its file, if it has one.
    pub fn save(&self) -> GazeResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.targets)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct GazeTargetLookAt {
    store: GazeTargetStore,
    slot: SlotBinding,
    active: Option<String>,
}

impl GazeTargetLookAt {
    /// Build from config, loading the store file if one is configured.
    pub fn new(topic: Topic, config: &GazeTargetConfig) -> Self {
        let store = match &config.store_path {
            Some(path) => GazeTargetStore::load(path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Failed to load gaze targets, starting empty");
                GazeTargetStore {
                    targets: HashMap::new(),
                    path: Some(path.clone()),
                }
            }),
            None => GazeTargetStore::new(),
        };
        Self::with_store(topic, store)
    }

    pub fn with_store(topic: Topic, store: GazeTargetStore) -> Self {
        Self {
            store,
            slot: SlotBinding::new(topic, "gaze_target", PriorityClass::GazeTarget),
            active: None,
        }
    }

    pub fn store(&self) -> &GazeTargetStore {
        &self.store
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    fn persist(&self) {
        if let Err(e) = self.store.save() {
            warn!(error = %e, "Failed to persist gaze targets");
        }
    }

    fn look_at(&mut self, name: &str, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        let Some(target) = self.store.get(name).cloned() else {
            info!(name, "Unknown gaze target, ignoring recall");
            return Ok(());
        };
        self.slot.set_frame(registry, target.frame)?;
        self.slot
            .push(registry, vec![LookCandidate::new(format!("target-{name}"), target.position, now)])?;
        self.active = Some(name.to_string());
        Ok(())
    }

    fn on_command(
        &mut self,
        command: &GazeTargetCommand,
        now: Timestamp,
        registry: &mut ArbitrationRegistry,
    ) -> GazeResult<()> {
        match command {
            GazeTargetCommand::Create { name, frame, position } => {
                if !position.is_finite() {
                    telemetry::record_malformed_event("gaze_target");
                    return Err(GazeError::malformed_event(format!("target '{name}' position is not finite")));
                }
                self.store.insert(
                    name.clone(),
                    StoredTarget {
                        frame: frame.clone(),
                        position: *position,
                    },
                );
                debug!(name = %name, frame = %frame, "Gaze target stored");
                self.persist();
                if self.active.as_deref() == Some(name.as_str()) {
                    self.look_at(name, now, registry)?;
                }
                Ok(())
            }
            GazeTargetCommand::Recall { name } => self.look_at(name, now, registry),
            GazeTargetCommand::Clear { name } => {
                self.active = None;
                self.slot.clear(registry)?;
                if let Some(name) = name {
                    if self.store.remove(name).is_some() {
                        self.persist();
                    }
                }
                Ok(())
            }
        }
    }
}

impl Contributor for GazeTargetLookAt {
    fn name(&self) -> &str {
        self.slot.name()
    }

    fn start(&mut self, _now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.slot.register(registry, FrameId::robot())?;
        info!(targets = self.store.len(), "Gaze target store ready");
        Ok(())
    }

    fn on_event(&mut self, event: &GazeEvent, now: Timestamp, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        match event {
            GazeEvent::GazeTarget { command } => self.on_command(command, now, registry),
            _ => Ok(()),
        }
    }

    fn shutdown(&mut self, registry: &mut ArbitrationRegistry) -> GazeResult<()> {
        self.slot.release(registry)
    }

    fn diagnostics(&self) -> ContributorDiagnostics {
        ContributorDiagnostics {
            name: self.slot.name().to_string(),
            details: json!({
                "active": self.active,
                "targets": self.store.len(),
            }),
        }
    }
}
