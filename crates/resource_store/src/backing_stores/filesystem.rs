use std::io::Result;

use camino::{Utf8Path, Utf8PathBuf};

use super::BackingStoreTrait;

/// A resource store over a directory of the filesystem.
pub(crate) struct FilesystemStore {
    root: Utf8PathBuf,
}

impl FilesystemStore {
    pub(crate) fn new(root: Utf8PathBuf) -> Result<FilesystemStore> {
        if !root.try_exists()? {
            return Err(std::io::ErrorKind::NotFound.into());
        }

        if !root.metadata()?.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{} is not a directory", root),
            ));
        }

        Ok(FilesystemStore { root })
    }

    fn resolve(&self, key: &str) -> Result<Utf8PathBuf> {
        super::validate_key(key)?;
        Ok(self.root.join(key))
    }
}

/// Turn a path found under `root` back into a `/`-separated key.
fn path_to_key(root: &Utf8Path, path: &std::path::Path) -> Result<String> {
    let path = Utf8Path::from_path(path).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} is not valid UTF-8", path.display()),
        )
    })?;
    let suffix = path
        .strip_prefix(root)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    Ok(suffix
        .components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/"))
}

fn wrap_walker(root: Utf8PathBuf, start: Utf8PathBuf) -> super::KeyIter {
    let walker = walkdir::WalkDir::new(&start)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |r| {
            let out = r
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
                .and_then(|x| {
                    if !x.file_type().is_file() {
                        return Ok(None);
                    }

                    path_to_key(&root, x.path()).map(Some)
                });

            match out {
                Ok(None) => None,
                Ok(Some(x)) => Some(Ok(x)),
                Err(e) => Some(Err(e)),
            }
        });

    Box::new(walker)
}

impl BackingStoreTrait for FilesystemStore {
    fn open(&self, key: &str) -> Result<Box<dyn std::io::Read>> {
        let path = self.resolve(key)?;
        // Directories open fine on some platforms and then fail on read; report them as missing up front.
        if path.is_dir() {
            return Err(std::io::ErrorKind::NotFound.into());
        }
        Ok(Box::new(std::fs::File::open(path)?))
    }

    fn iter_subdir(&self, prefix: &str) -> Result<super::KeyIter> {
        let start = self.resolve(prefix)?;
        if !start.try_exists()? {
            return Err(std::io::ErrorKind::NotFound.into());
        }

        Ok(wrap_walker(self.root.clone(), start))
    }
}
