//! Plan persistence. Callers get a `dyn PlanStore`; nothing here is global.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::info;

use crate::models::{TripPlan, TripPlanPatch};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage snapshot is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn save(&self, plan: TripPlan) -> Result<(), StoreError>;
    async fn get(&self, id: &str) -> Result<Option<TripPlan>, StoreError>;
    /// All plans, oldest first.
    async fn list(&self) -> Result<Vec<TripPlan>, StoreError>;
    async fn update(&self, id: &str, patch: TripPlanPatch) -> Result<Option<TripPlan>, StoreError>;
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

type PlanMap = HashMap<String, TripPlan>;

fn ordered(plans: &PlanMap) -> Vec<TripPlan> {
    let mut plans: Vec<TripPlan> = plans.values().cloned().collect();
    plans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    plans
}

fn patch_in(plans: &mut PlanMap, id: &str, patch: TripPlanPatch) -> Option<TripPlan> {
    let plan = plans.get_mut(id)?;
    patch.apply(plan, Utc::now());
    Some(plan.clone())
}

#[derive(Default)]
pub struct MemoryStore {
    plans: RwLock<PlanMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn save(&self, plan: TripPlan) -> Result<(), StoreError> {
        self.plans.write().insert(plan.id.clone(), plan);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<TripPlan>, StoreError> {
        Ok(self.plans.read().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<TripPlan>, StoreError> {
        Ok(ordered(&self.plans.read()))
    }

    async fn update(&self, id: &str, patch: TripPlanPatch) -> Result<Option<TripPlan>, StoreError> {
        Ok(patch_in(&mut self.plans.write(), id, patch))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.plans.write().remove(id).is_some())
    }
}

/// Memory map mirrored to a JSON file. A mutation becomes visible only
/// after its snapshot has been written.
pub struct FileStore {
    path: PathBuf,
    memory: MemoryStore,
    // Held across the whole read-modify-write of a mutation.
    writer: tokio::sync::Mutex<()>,
}

impl FileStore {
    /// Loads the snapshot at `path`, starting empty when the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let memory = MemoryStore::new();
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let plans: Vec<TripPlan> = serde_json::from_slice(&bytes)?;
                info!("📂 Loaded {} plans from {}", plans.len(), path.display());
                memory.plans.write().extend(plans.into_iter().map(|p| (p.id.clone(), p)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("📂 No snapshot at {}, starting empty", path.display());
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Self { path, memory, writer: tokio::sync::Mutex::new(()) })
    }

    /// Applies `change` to a copy of the map, writes that copy to disk and only
    /// then swaps it in. `change` returns `None` when there is nothing to write.
    async fn commit<R>(
        &self,
        change: impl FnOnce(&mut PlanMap) -> Option<R>,
    ) -> Result<Option<R>, StoreError> {
        let _guard = self.writer.lock().await;
        let mut next = self.memory.plans.read().clone();
        let Some(result) = change(&mut next) else {
            return Ok(None);
        };
        self.write_snapshot(&next).await?;
        *self.memory.plans.write() = next;
        Ok(Some(result))
    }

    async fn write_snapshot(&self, plans: &PlanMap) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&ordered(plans))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl PlanStore for FileStore {
    async fn save(&self, plan: TripPlan) -> Result<(), StoreError> {
        self.commit(|plans| {
            plans.insert(plan.id.clone(), plan);
            Some(())
        })
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<TripPlan>, StoreError> {
        self.memory.get(id).await
    }

    async fn list(&self) -> Result<Vec<TripPlan>, StoreError> {
        self.memory.list().await
    }

    async fn update(&self, id: &str, patch: TripPlanPatch) -> Result<Option<TripPlan>, StoreError> {
        self.commit(|plans| patch_in(plans, id, patch)).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self.commit(|plans| plans.remove(id).map(|_| ())).await?;
        Ok(removed.is_some())
    }
}
