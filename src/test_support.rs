//! Test support utilities shared across unit and integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::backend::{Backend, BackendFuture, ResourceRef, ResourceSpec};
use crate::provision::ProgressSink;
use crate::registry::{Registry, RegistryError, RegistryWriter};

/// Errors raised by [`ScriptedBackend`] to model failure points.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScriptedBackendError {
    /// Models a name-already-exists rejection.
    #[error("name '{0}' already exists")]
    Conflict(String),
    /// Models a readiness deadline expiry.
    #[error("timed out waiting for '{0}'")]
    Timeout(String),
    /// Models an operator interrupt observed between polls.
    #[error("cancelled while waiting for '{0}'")]
    Cancelled(String),
    /// Models a transient control-plane failure.
    #[error("provider failure for '{0}'")]
    Provider(String),
}

/// Which operation a scripted failure applies to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ScriptedOp {
    /// The create call for a resource.
    Create,
    /// The readiness wait for a resource.
    Wait,
    /// The bucket purge during cleanup.
    Purge,
    /// The table delete during cleanup.
    Delete,
}

#[derive(Debug, Default)]
struct State {
    failures: HashMap<(String, ScriptedOp), ScriptedBackendError>,
    purged_objects: HashMap<String, usize>,
    operations: Vec<String>,
}

/// Backend double that records every operation and fails on request.
///
/// Failures are keyed by resource name and operation, so scenarios can
/// target, say, the wait step of the second target bucket without touching
/// anything else.
#[derive(Clone, Debug, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<State>>,
}

impl ScriptedBackend {
    /// Creates a backend double with no scripted failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scripts a failure for one operation on one resource name.
    pub fn fail(&self, name: &str, op: ScriptedOp, error: ScriptedBackendError) {
        self.lock()
            .failures
            .insert((name.to_owned(), op), error);
    }

    /// Sets how many objects a bucket purge reports as deleted.
    pub fn set_purged_objects(&self, name: &str, count: usize) {
        self.lock().purged_objects.insert(name.to_owned(), count);
    }

    /// Returns every operation performed, in order, as `"<op> <name>"`.
    #[must_use]
    pub fn operations(&self) -> Vec<String> {
        self.lock().operations.clone()
    }

    fn perform(
        &self,
        op: ScriptedOp,
        label: &str,
        name: &str,
    ) -> Result<(), ScriptedBackendError> {
        let mut state = self.lock();
        state.operations.push(format!("{label} {name}"));
        state
            .failures
            .get(&(name.to_owned(), op))
            .cloned()
            .map_or(Ok(()), Err)
    }
}

impl Backend for ScriptedBackend {
    type Error = ScriptedBackendError;

    fn create_bucket<'a>(
        &'a self,
        spec: &'a ResourceSpec,
    ) -> BackendFuture<'a, ResourceRef, Self::Error> {
        Box::pin(async move {
            self.perform(ScriptedOp::Create, "create-bucket", &spec.name)?;
            Ok(spec.handle())
        })
    }

    fn create_table<'a>(
        &'a self,
        spec: &'a ResourceSpec,
    ) -> BackendFuture<'a, ResourceRef, Self::Error> {
        Box::pin(async move {
            self.perform(ScriptedOp::Create, "create-table", &spec.name)?;
            Ok(spec.handle())
        })
    }

    fn wait_until_active<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move { self.perform(ScriptedOp::Wait, "wait", &resource.name) })
    }

    fn purge_bucket<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BackendFuture<'a, usize, Self::Error> {
        Box::pin(async move {
            self.perform(ScriptedOp::Purge, "purge-bucket", &resource.name)?;
            Ok(self
                .lock()
                .purged_objects
                .get(&resource.name)
                .copied()
                .unwrap_or(0))
        })
    }

    fn delete_table<'a>(
        &'a self,
        resource: &'a ResourceRef,
    ) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move { self.perform(ScriptedOp::Delete, "delete-table", &resource.name) })
    }
}

/// Progress sink that records messages for assertions.
#[derive(Clone, Debug, Default)]
pub struct RecordingProgress {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingProgress {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded messages.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn step(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_owned());
    }
}

/// Registry writer that keeps every saved snapshot in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryRegistry {
    saves: Arc<Mutex<Vec<Registry>>>,
    fail_after: Arc<Mutex<Option<usize>>>,
}

impl MemoryRegistry {
    /// Creates an in-memory writer that never fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the writer fail once the given number of saves has succeeded.
    pub fn fail_after(&self, saves: usize) {
        *self
            .fail_after
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(saves);
    }

    /// Returns the most recently saved registry, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Registry> {
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Returns how many saves have succeeded.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl RegistryWriter for MemoryRegistry {
    fn save(&self, registry: &Registry) -> Result<(), RegistryError> {
        let mut saves = self.saves.lock().unwrap_or_else(PoisonError::into_inner);
        let limit = *self
            .fail_after
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(max_saves) = limit
            && saves.len() >= max_saves
        {
            return Err(RegistryError::Io {
                path: camino::Utf8PathBuf::from("memory-registry"),
                message: String::from("scripted write failure"),
            });
        }
        saves.push(registry.clone());
        Ok(())
    }
}
