//! Static arrays shipped in the module's virtual filesystem

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{DeviceError, DeviceResult};

/// Subdirectory of the build directory holding serialized arrays
pub const STATIC_ARRAYS_DIR: &str = "static_arrays";

/// Named constant datasets. Names are unique; iteration is sorted by name.
#[derive(Debug, Clone, Default)]
pub struct StaticArrays {
    arrays: BTreeMap<String, Vec<u8>>,
}

impl StaticArrays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an array; a name can only be used once
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        data: Vec<u8>,
    ) -> DeviceResult<()> {
        let name = name.into();
        if self.arrays.contains_key(&name) {
            return Err(DeviceError::DuplicateStaticArray(name));
        }
        self.arrays.insert(name, data);
        Ok(())
    }

    /// Register an array of doubles, stored little-endian
    pub fn insert_f64(
        &mut self,
        name: impl Into<String>,
        values: &[f64],
    ) -> DeviceResult<()> {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.insert(name, data)
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&[u8]> {
        self.arrays.get(name).map(Vec::as_slice)
    }

    /// Names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// One `--preload-file` directive per array, sorted by name
    pub fn preload_flags(&self) -> String {
        self.names()
            .map(|name| format!("--preload-file {}/{}", STATIC_ARRAYS_DIR, name))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Write every array to `<directory>/static_arrays/<name>`
    pub fn write(
        &self,
        directory: &Path,
    ) -> DeviceResult<()> {
        let target = directory.join(STATIC_ARRAYS_DIR);
        fs::create_dir_all(&target)?;
        for (name, data) in &self.arrays {
            fs::write(target.join(name), data)?;
        }
        debug!("Wrote {} static arrays to {}", self.arrays.len(), target.display());
        Ok(())
    }

    pub fn clear(&mut self) {
        self.arrays.clear();
    }
}
