use std::io::{Read, Result as IoResult};

use camino::Utf8PathBuf;
use log::*;

use crate::backing_stores::*;

pub struct ResourceStore {
    backing_store: BackingStore,
}

impl ResourceStore {
    /// Open a store over the directory at `root`, which must exist.
    pub fn open_fs(root: Utf8PathBuf) -> IoResult<ResourceStore> {
        debug!("Opening filesystem resource store at {}", root);
        let backing_store = BackingStore::new_filesystem(root)?;
        Ok(ResourceStore { backing_store })
    }

    /// An empty in-memory store.  Fill it with [ResourceStore::insert].
    pub fn in_memory() -> ResourceStore {
        ResourceStore {
            backing_store: BackingStore::new_memory(),
        }
    }

    /// Add a resource to an in-memory store, replacing any previous resource with the same key.
    ///
    /// Filesystem stores are read-only and return [std::io::ErrorKind::Unsupported].
    pub fn insert(&mut self, key: &str, contents: impl Into<Vec<u8>>) -> IoResult<()> {
        match &mut self.backing_store {
            BackingStore::Memory(m) => m.insert(key, contents.into()),
            BackingStore::Filesystem(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "filesystem resource stores are read-only",
            )),
        }
    }

    /// Open the resource at `key`.
    ///
    /// Fails with [std::io::ErrorKind::NotFound] if this store has no such resource.
    pub fn open(&self, key: &str) -> IoResult<Box<dyn Read>> {
        self.backing_store.open(key)
    }

    /// List the keys of all resources under `prefix`, sorted.
    pub fn list(&self, prefix: &str) -> IoResult<Vec<String>> {
        let mut keys = self.backing_store.iter_subdir(prefix)?.collect::<IoResult<Vec<_>>>()?;
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_store() -> ResourceStore {
        let fspath = format!("{}/test_resources", env!("CARGO_MANIFEST_DIR"));
        ResourceStore::open_fs(fspath.into()).expect("Could not open the resource store")
    }

    fn read_to_string(store: &ResourceStore, key: &str) -> String {
        let mut opened = store.open(key).unwrap();
        let mut out = String::new();
        opened.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_basic_reading() {
        let store = get_test_store();
        assert_eq!(read_to_string(&store, "datasets/greeting.txt"), "hello");
    }

    #[test]
    fn test_missing_is_not_found() {
        let store = get_test_store();
        let err = store.open("datasets/missing.json").err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);

        let err = store.open("datasets").err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_escaping_root_is_rejected() {
        let store = get_test_store();
        let err = store.open("../Cargo.toml").err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        let err = store.open("/etc/passwd").err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_listing() {
        let store = get_test_store();
        assert_eq!(
            store.list("datasets").unwrap(),
            vec![
                "datasets/greeting.txt".to_string(),
                "datasets/nested/more.txt".to_string()
            ]
        );
    }

    #[test]
    fn test_memory_store() {
        let mut store = ResourceStore::in_memory();
        store.insert("seed/b.json", "b").unwrap();
        store.insert("seed/a.json", "a").unwrap();
        store.insert("other.json", "other").unwrap();

        assert_eq!(read_to_string(&store, "seed/a.json"), "a");
        assert_eq!(
            store.list("seed").unwrap(),
            vec!["seed/a.json".to_string(), "seed/b.json".to_string()]
        );
        assert_eq!(
            store.open("seed/c.json").err().unwrap().kind(),
            std::io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_filesystem_store_is_read_only() {
        let mut store = get_test_store();
        assert_eq!(
            store.insert("x", "y").unwrap_err().kind(),
            std::io::ErrorKind::Unsupported
        );
    }
}
