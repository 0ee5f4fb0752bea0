mod filesystem;
mod memory;

use std::io::Result as IoResult;

pub(crate) use filesystem::*;
pub(crate) use memory::*;

pub(crate) type KeyIter = Box<dyn Iterator<Item = IoResult<String>>>;

#[enum_dispatch::enum_dispatch(BackingStore)]
pub(crate) trait BackingStoreTrait {
    /// Read the "path" specified.
    fn open(&self, key: &str) -> IoResult<Box<dyn std::io::Read>>;

    /// Iterate over all keys in this store rooted at the specified subkey, in sorted order. For example "a/b" would
    /// yield "a/b/c" but not "a/b" itself.
    fn iter_subdir(&self, prefix: &str) -> IoResult<KeyIter>;
}

#[enum_dispatch::enum_dispatch]
pub(crate) enum BackingStore {
    Filesystem(FilesystemStore),
    Memory(MemoryStore),
}

impl BackingStore {
    pub(crate) fn new_filesystem(root: camino::Utf8PathBuf) -> IoResult<BackingStore> {
        Ok(BackingStore::Filesystem(FilesystemStore::new(root)?))
    }

    pub(crate) fn new_memory() -> BackingStore {
        BackingStore::Memory(MemoryStore::default())
    }
}

/// Reject keys which could escape the root of a store: absolute paths, `..`, and the like.
pub(crate) fn validate_key(key: &str) -> IoResult<()> {
    use camino::{Utf8Component, Utf8Path};

    let escapes = Utf8Path::new(key)
        .components()
        .any(|c| !matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir));
    if key.is_empty() || escapes {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not a valid resource key", key),
        ));
    }

    Ok(())
}
