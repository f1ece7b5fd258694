//! Shared test fixtures: an in-memory host world and an invocation recorder.
#![allow(dead_code)]

use std::any::Any;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Once};

use systemvisor::{
    CommandBuffer, ComponentQuery, EntityId, EntityStore, HostWorld, PlayerId, WorldId,
    WorldLookup, WorldView,
};

/// Installs a per-binary tracing subscriber honoring `RUST_LOG`, so failure
/// logs from isolation paths are visible under `--nocapture`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Records handler invocations; doubles as the host's command buffer so
/// handlers can reach it through `ctx.commands_as::<Recorder>()`.
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl CommandBuffer for Recorder {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Minimal entity store: entities with string-keyed component sets.
pub struct TestWorld {
    entities: Vec<(EntityId, HashSet<String>)>,
    pub recorder: Recorder,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            recorder: Recorder::new(),
        }
    }

    pub fn spawn(&mut self, id: u64, components: &[&str]) -> EntityId {
        let entity = EntityId(id);
        self.entities
            .push((entity, components.iter().map(|c| c.to_string()).collect()));
        entity
    }

    /// View over this world, with player-to-world lookup wired.
    pub fn view(&self) -> WorldView<'_> {
        WorldView::new(self, &self.recorder).with_worlds(self)
    }
}

impl EntityStore for TestWorld {
    fn select(&self, query: &ComponentQuery) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, components)| {
                query
                    .required()
                    .iter()
                    .all(|key| components.contains(key.as_str()))
            })
            .map(|(id, _)| *id)
            .collect()
    }
}

impl WorldLookup for TestWorld {
    /// Every player resolves to `WorldId(100 + player)`, so tests can assert
    /// pass-through without a real universe registry.
    fn world_of(&self, player: PlayerId) -> Option<WorldId> {
        Some(WorldId(100 + player.0))
    }
}

impl HostWorld for TestWorld {
    fn store(&self) -> &dyn EntityStore {
        self
    }

    fn commands(&self) -> &dyn CommandBuffer {
        &self.recorder
    }

    fn worlds(&self) -> &dyn WorldLookup {
        self
    }
}
