//! Common test utilities and fixtures.

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use botkit::cache::MemoryCache;
use botkit::cooldown::CooldownEngine;
use botkit::cooldown::InvocationContext;
use botkit::cooldown::ManualClock;
use botkit::extension::ExtensionModule;
use botkit::extension::Hook;
use botkit::extension::Schema;
use futures::FutureExt;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

/// A fixed invocation snapshot.
#[derive(Debug, Clone, Default)]
#[allow(dead_code)]
pub struct TestInvocation {
    pub user_id: u64,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub role_ids: Vec<u64>,
}

#[allow(dead_code)]
impl TestInvocation {
    pub fn user(user_id: u64) -> Self {
        Self {
            user_id,
            guild_id: Some(100),
            channel_id: 200,
            role_ids: Vec::new(),
        }
    }
}

impl InvocationContext for TestInvocation {
    fn user_id(&self) -> u64 {
        self.user_id
    }

    fn guild_id(&self) -> Option<u64> {
        self.guild_id
    }

    fn channel_id(&self) -> u64 {
        self.channel_id
    }

    fn role_ids(&self) -> &[u64] {
        &self.role_ids
    }
}

/// An engine over a fresh memory cache, with virtual time starting at `start`.
#[allow(dead_code)]
pub fn manual_engine(start: f64) -> (CooldownEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start));
    let engine = CooldownEngine::with_clock(Arc::new(MemoryCache::new()), clock.clone());
    (engine, clock)
}

/// Shared, ordered record of what hooks did.
pub type Journal = Arc<Mutex<Vec<String>>>;

#[allow(dead_code)]
pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

#[allow(dead_code)]
pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// A module whose declarations are set field by field.
#[derive(Clone)]
#[allow(dead_code)]
pub struct TestModule {
    pub name: &'static str,
    pub default: Option<Value>,
    pub schema: Option<Schema>,
    pub hooks: Vec<Hook>,
    pub patch: Option<Hook>,
}

#[allow(dead_code)]
impl TestModule {
    /// Enabled by default, with a setup hook that does nothing.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            default: Some(json!({ "enabled": true })),
            schema: None,
            hooks: vec![Hook::setup(&[], |_| async { Ok(()) }.boxed())],
            patch: None,
        }
    }

    /// Setup hook that appends `setup:{name}` to `journal`.
    pub fn journaling_setup(mut self, journal: &Journal) -> Self {
        let journal = journal.clone();
        let name = self.name;
        self.hooks = vec![Hook::setup(&[], move |_| {
            let journal = journal.clone();
            async move {
                journal.lock().unwrap().push(format!("setup:{name}"));
                Ok(())
            }
            .boxed()
        })];
        self
    }

    /// Patch that yields to the runtime, then appends `patch:{name}` to `journal`.
    pub fn journaling_patch(mut self, journal: &Journal) -> Self {
        let journal = journal.clone();
        let name = self.name;
        self.patch = Some(Hook::patch(move |_| {
            let journal = journal.clone();
            async move {
                tokio::task::yield_now().await;
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                journal.lock().unwrap().push(format!("patch:{name}"));
                Ok(())
            }
            .boxed()
        }));
        self
    }
}

impl ExtensionModule for TestModule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn default_config(&self) -> Option<Value> {
        self.default.clone()
    }

    fn schema(&self) -> Option<Schema> {
        self.schema.clone()
    }

    fn hooks(&self) -> Vec<Hook> {
        self.hooks.clone()
    }

    fn patch(&self) -> Option<Hook> {
        self.patch.clone()
    }
}

/// A temporary extensions root with one directory per name.
#[allow(dead_code)]
pub fn extensions_root(names: &[&str]) -> TempDir {
    let root = TempDir::new().expect("Failed to create temp dir");
    for name in names {
        std::fs::create_dir(root.path().join(name)).expect("Failed to create extension dir");
    }
    root
}

#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).expect("Failed to write fixture");
}
