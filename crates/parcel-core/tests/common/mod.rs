//! Shared fixtures: a temporary artifact tree plus an importer with its own
//! registry, so tests never share cached modules.

#![allow(dead_code)]

use parcel_core::{ConflictPolicy, Importer, ModuleRegistry, ParcelConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `source` to `<root>/<relative>`, creating parent directories
    pub fn write(&self, relative: &str, source: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, source).unwrap();
        path
    }

    pub fn config(&self) -> ParcelConfig {
        ParcelConfig::default().with_search_paths(vec![self.root().to_path_buf()])
    }

    pub fn importer(&self) -> Importer {
        Importer::with_registry(self.config(), Arc::new(ModuleRegistry::new()))
    }

    pub fn strict_importer(&self) -> Importer {
        let mut config = self.config();
        config.bindings.on_conflict = ConflictPolicy::Error;
        Importer::with_registry(config, Arc::new(ModuleRegistry::new()))
    }
}

pub const GREET: &str = r#"
# greeting helpers
const GREETING = "hi"
fn hello() = GREETING
fn greet(name) = GREETING + ", " + name
"#;
