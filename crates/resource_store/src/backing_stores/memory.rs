use std::collections::BTreeMap;
use std::io::Result;

use super::BackingStoreTrait;

/// A store of resources bundled into the binary or built up by tests.
#[derive(Default)]
pub(crate) struct MemoryStore {
    resources: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub(crate) fn insert(&mut self, key: &str, contents: Vec<u8>) -> Result<()> {
        super::validate_key(key)?;
        self.resources.insert(key.to_string(), contents);
        Ok(())
    }
}

impl BackingStoreTrait for MemoryStore {
    fn open(&self, key: &str) -> Result<Box<dyn std::io::Read>> {
        let data = self
            .resources
            .get(key)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        Ok(Box::new(std::io::Cursor::new(data.clone())))
    }

    fn iter_subdir(&self, prefix: &str) -> Result<super::KeyIter> {
        super::validate_key(prefix)?;
        let dir_prefix = format!("{}/", prefix.trim_end_matches('/'));
        let keys = self
            .resources
            .keys()
            .filter(|k| k.starts_with(&dir_prefix))
            .cloned()
            .map(Ok)
            .collect::<Vec<_>>();

        if keys.is_empty() {
            return Err(std::io::ErrorKind::NotFound.into());
        }

        Ok(Box::new(keys.into_iter()))
    }
}
