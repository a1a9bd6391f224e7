// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Assets
//!
//! Shaders are compiled ahead of time to SPIR-V and looked up by name at runtime.  A shader named
//! `pbr.frag` lives at `shaders/pbr.frag.spv` below one of the asset roots.  See `AssetDirs` for
//! where roots come from.

pub mod assets;
pub use assets::*;

use std::ffi::OsStr;

mod prelude {
    pub use super::AssetError;
    pub use super::AssetKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Shader,
}

impl AssetKind {
    fn ext(&self) -> &'static str {
        match self {
            AssetKind::Shader => "spv",
        }
    }

    fn subdir(&self) -> &'static OsStr {
        match self {
            AssetKind::Shader => OsStr::new("shaders"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("read failed: {:?}", .0)]
    ReadError(#[from] std::io::Error),
    #[error("file not found: {:?}", .0)]
    NotFound(String),
    #[error("load spirv failed: {:?}", .0)]
    InvalidShader(String),
}
