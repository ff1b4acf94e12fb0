//! Artifact loader
//!
//! Turns an [`ArtifactPath`] into a populated [`ModuleHandle`]: find the file
//! under one of the search roots, parse it, and evaluate its declarations into
//! a fresh module scope.

use crate::artifact::{self, Artifact};
use crate::error::ImportError;
use crate::import::Importer;
use crate::module::{evaluate_artifact, ModuleHandle};
use crate::namespace::{ArtifactPath, Namespace};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    search_paths: Vec<PathBuf>,
}

impl ArtifactLoader {
    /// Roots are tried in order, first match wins
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find the file backing `path`
    pub fn locate(&self, path: &ArtifactPath) -> Result<PathBuf, ImportError> {
        let mut tried = Vec::with_capacity(self.search_paths.len());
        for root in &self.search_paths {
            let candidate = root.join(path.as_path());
            if candidate.is_file() {
                return canonicalize(&candidate);
            }
            tried.push(candidate);
        }
        Err(ImportError::ArtifactNotFound {
            namespace: path.namespace().to_string(),
            tried,
        })
    }

    /// Read, parse and evaluate the artifact for `path` into a new module.
    ///
    /// Imports declared inside the artifact go back through `importer`, so
    /// they share its registry.
    pub fn load(&self, path: &ArtifactPath, importer: &Importer) -> Result<ModuleHandle, ImportError> {
        let file = self.locate(path)?;
        let artifact = read_artifact(&file)?;

        let module = ModuleHandle::new(path.namespace(), file.clone());
        module.record_source(file);
        evaluate_artifact(&module, &artifact, importer)?;

        info!(
            namespace = %module.name(),
            file = %module.source_file().display(),
            load_id = module.load_id(),
            "loaded artifact"
        );
        Ok(module)
    }

    /// Evaluate a sibling artifact into an existing module.
    ///
    /// `name` follows the namespace rules, so it may omit the extension but
    /// never be absolute or climb out with `..`. It is resolved against the
    /// directory of the module's own source file, then against the working
    /// directory. A file already evaluated into the module is skipped.
    pub fn load_relative(
        &self,
        module: &ModuleHandle,
        name: &str,
        importer: &Importer,
    ) -> Result<PathBuf, ImportError> {
        let relative = Namespace::parse(name)?.artifact_path();
        let file = relative.as_path();
        let _extending = module.lock_extension();

        let mut candidates = Vec::with_capacity(2);
        if let Some(dir) = module.source_dir() {
            candidates.push(dir.join(file));
        }
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(file));
        }

        let found = match candidates.iter().find(|c| c.is_file()) {
            Some(found) => canonicalize(found)?,
            None => {
                return Err(ImportError::ArtifactNotFound {
                    namespace: name.to_string(),
                    tried: candidates,
                })
            }
        };

        if module.sources().contains(&found) {
            debug!(module = %module.name(), file = %found.display(), "already loaded into module");
            return Ok(found);
        }

        let artifact = read_artifact(&found)?;
        // Recorded up front so a load cycle back to this file stops here
        module.record_source(found.clone());
        if let Err(err) = evaluate_artifact(module, &artifact, importer) {
            module.forget_source(&found);
            warn!(module = %module.name(), file = %found.display(), error = %err, "extension failed");
            return Err(err);
        }

        info!(module = %module.name(), file = %found.display(), "extended module");
        Ok(found)
    }
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new(vec![PathBuf::from(".")])
    }
}

fn read_artifact(file: &Path) -> Result<Artifact, ImportError> {
    let source = fs::read_to_string(file).map_err(|e| ImportError::io(file, e))?;
    artifact::parse(&source).map_err(|error| ImportError::Parse {
        path: file.to_path_buf(),
        error,
    })
}

fn canonicalize(path: &Path) -> Result<PathBuf, ImportError> {
    path.canonicalize().map_err(|e| ImportError::io(path, e))
}
