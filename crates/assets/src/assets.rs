// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Asset Lookup
//!
//! `AssetDirs` is a set of realized directories where lookups may search.  Hold onto it for doing
//! many lookups at computer speed but re-initialize it for human-speed queries.
//!
//! ## Precedence Rules
//!
//! 1. `PRISM_ASSETS_DIR` enabling overrides for any purpose.
//! 2. `assets/` below the working directory.
//! 3. On **debug builds**, `assets/` below `CARGO_MANIFEST_DIR`.  On **release builds**, `prism/assets`
//!    in the user's local data directory, then in the system data directory.
//!
//! `PRISM_ASSETS_DIR` should point directly to an assets root, i.e. a folder containing a
//! `shaders` directory.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::prelude::*;

pub const ASSETS_DIR_ENV: &str = "PRISM_ASSETS_DIR";

/// Pre-calculated and checked parent paths for reuse in asset look-ups.
pub struct AssetDirs {
    search_paths: Vec<PathBuf>,
}

impl AssetDirs {
    /// Checks asset search directories once on construction.
    pub fn new() -> Self {
        let mut search_paths = Vec::with_capacity(4);

        let as_assets_root = |p: PathBuf| -> Option<PathBuf> {
            p.canonicalize().ok().filter(|p| p.is_dir())
        };

        // Treat the given path as a parent containing an `assets/` subdir.
        let with_assets_subdir = |p: PathBuf| as_assets_root(p.join("assets"));

        // Always highest priority: explicit override.
        if let Ok(raw) = std::env::var(ASSETS_DIR_ENV) {
            match as_assets_root(PathBuf::from(&raw)) {
                Some(path) => search_paths.push(path),
                None => warn!("invalid {ASSETS_DIR_ENV} (path not found): {raw}"),
            }
        }

        search_paths.extend(std::env::current_dir().ok().and_then(with_assets_subdir));

        if cfg!(debug_assertions) {
            search_paths.extend(
                std::env::var("CARGO_MANIFEST_DIR")
                    .ok()
                    .map(PathBuf::from)
                    .and_then(with_assets_subdir),
            );
        } else {
            search_paths.extend(
                dirs::data_local_dir()
                    .map(|d| d.join("prism"))
                    .and_then(with_assets_subdir),
            );
            search_paths.extend(
                dirs::data_dir()
                    .map(|d| d.join("prism"))
                    .and_then(with_assets_subdir),
            );
        }

        search_paths.dedup();
        AssetDirs { search_paths }
    }

    /// Searches only `roots`, in order.  Roots that do not exist are dropped.
    pub fn with_roots(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        AssetDirs {
            search_paths: roots.into_iter().filter(|p| p.is_dir()).collect(),
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Checks asset paths for `name`.  The kind's extension is appended, so `pbr.vert` finds
    /// `shaders/pbr.vert.spv`.
    pub fn find(&self, name: &str, kind: AssetKind) -> Option<PathBuf> {
        let file = PathBuf::from(kind.subdir()).join(format!("{name}.{}", kind.ext()));

        let found = self
            .search_paths
            .iter()
            .map(|root| root.join(&file))
            .find(|candidate| candidate.is_file());
        if found.is_none() {
            debug!(?kind, name, roots = ?self.search_paths, "asset not found");
        }
        found
    }

    pub fn find_bytes(&self, name: &str, kind: AssetKind) -> Result<Vec<u8>, AssetError> {
        let path = self
            .find(name, kind)
            .ok_or_else(|| AssetError::NotFound(name.to_owned()))?;
        Ok(std::fs::read(path)?)
    }

    /// SPIR-V words in host order.
    pub fn find_shader(&self, name: &str) -> Result<Vec<u32>, AssetError> {
        let bytes = self.find_bytes(name, AssetKind::Shader)?;
        if bytes.len() % size_of::<u32>() != 0 {
            return Err(AssetError::InvalidShader(format!(
                "{name}: SPIR-V length not multiple of 4: {} bytes",
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(size_of::<u32>())
            .map(bytemuck::pod_read_unaligned::<u32>)
            .collect())
    }
}

impl Default for AssetDirs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_find_shader() {
        let root = tempfile::tempdir().unwrap();
        let shaders = root.path().join("shaders");
        std::fs::create_dir_all(&shaders).unwrap();
        let words = [0x0723_0203u32, 0x0001_0000, 0, 1, 0];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_ne_bytes()).collect();
        std::fs::write(shaders.join("pbr.vert.spv"), &bytes).unwrap();
        std::fs::write(shaders.join("broken.frag.spv"), [1u8, 2, 3]).unwrap();

        let dirs = AssetDirs::with_roots([root.path().join("missing"), root.path().to_owned()]);
        assert_eq!(dirs.search_paths().len(), 1);
        assert_eq!(dirs.find_shader("pbr.vert").unwrap(), words);
        assert!(matches!(
            dirs.find_shader("pbr.frag"),
            Err(AssetError::NotFound(_))
        ));
        assert!(matches!(
            dirs.find_shader("broken.frag"),
            Err(AssetError::InvalidShader(_))
        ));
    }
}
