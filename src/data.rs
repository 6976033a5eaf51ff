//! Locate files in the Galacticus datasets repository.
//!
//! The repository root comes from the `GALACTICUS_DATA_PATH` environment
//! variable (or the `[paths]` section of the configuration). It must contain
//! a `static/` sub-repository; a `dynamic/` sub-repository for derived files
//! is created on demand and may be redirected with
//! `GALACTICUS_DYNAMIC_DATA_PATH`.

use std::path::{Path, PathBuf};

use log::warn;

use crate::config::rc_params;
use crate::fileformats::hdf5::name_matches;

pub const DATA_PATH_VAR: &str = "GALACTICUS_DATA_PATH";
pub const DYNAMIC_PATH_VAR: &str = "GALACTICUS_DYNAMIC_DATA_PATH";

#[derive(Clone, Debug)]
pub struct GalacticusData {
    path: PathBuf,
    static_path: PathBuf,
    dynamic_path: PathBuf,
}

impl GalacticusData {
    /// Resolve the repository from the environment/configuration.
    pub fn locate() -> Result<GalacticusData, anyhow::Error> {
        let path = match std::env::var(DATA_PATH_VAR) {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => match rc_params().get("paths", DATA_PATH_VAR) {
                Some(p) => PathBuf::from(p),
                None => bail!(
                    "no path specified for the Galacticus datasets; set the \
                     '{DATA_PATH_VAR}' environment variable"
                ),
            },
        };
        let dynamic = std::env::var(DYNAMIC_PATH_VAR).ok().map(PathBuf::from);
        GalacticusData::at(path, dynamic)
    }

    /// Open a repository at an explicit root.
    pub fn at(path: PathBuf, dynamic: Option<PathBuf>) -> Result<GalacticusData, anyhow::Error> {
        ensure!(
            path.is_dir(),
            "datasets path '{}' does not exist",
            path.display()
        );
        let static_path = path.join("static");
        ensure!(
            static_path.is_dir(),
            "static datasets path '{}' does not exist",
            static_path.display()
        );
        let dynamic_path = dynamic.unwrap_or_else(|| path.join("dynamic"));
        if !dynamic_path.is_dir() {
            std::fs::create_dir_all(&dynamic_path)?;
        }
        Ok(GalacticusData {
            path,
            static_path,
            dynamic_path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn static_path(&self) -> &Path {
        &self.static_path
    }

    #[must_use]
    pub fn dynamic_path(&self) -> &Path {
        &self.dynamic_path
    }

    /// Search `static/` for a file matching a wildcard pattern.
    pub fn search_static(&self, pattern: &str) -> Result<PathBuf, anyhow::Error> {
        self.search_directory(&self.static_path, pattern, true)?
            .ok_or_else(|| anyhow!("unreachable: mandatory search returned nothing"))
    }

    /// Search `dynamic/`; no match is not an error.
    pub fn search_dynamic(&self, pattern: &str) -> Result<Option<PathBuf>, anyhow::Error> {
        self.search_directory(&self.dynamic_path, pattern, false)
    }

    /// Search the whole repository: `static/` first, then `dynamic/`.
    pub fn search(&self, pattern: &str) -> Result<PathBuf, anyhow::Error> {
        if let Some(path) = self.search_directory(&self.static_path, pattern, false)? {
            return Ok(path);
        }
        if let Some(path) = self.search_directory(&self.dynamic_path, pattern, false)? {
            return Ok(path);
        }
        bail!(
            "no files found in '{}' matching pattern '{}'",
            self.path.display(),
            pattern
        )
    }

    fn search_directory(
        &self,
        root: &Path,
        pattern: &str,
        mandatory: bool,
    ) -> Result<Option<PathBuf>, anyhow::Error> {
        let mut found = Vec::new();
        recursive_glob(root, pattern, &mut found)?;
        found.sort();
        if found.len() > 1 {
            warn!(
                "multiple files in '{}' match pattern '{}', returning the first",
                root.display(),
                pattern
            );
        }
        match found.into_iter().next() {
            Some(path) => Ok(Some(path)),
            None if mandatory => bail!(
                "no files found in '{}' matching pattern '{}'",
                root.display(),
                pattern
            ),
            None => Ok(None),
        }
    }
}

/// Recursive wildcard search over file names.
fn recursive_glob(
    root: &Path,
    pattern: &str,
    found: &mut Vec<PathBuf>,
) -> Result<(), anyhow::Error> {
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            recursive_glob(&path, pattern, found)?;
        } else if name_matches(pattern, &entry.file_name().to_string_lossy()) {
            found.push(path);
        }
    }
    Ok(())
}
