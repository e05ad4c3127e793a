//! Codec selection.
//!
//! Codecs are probed in registration order; only C3D is registered.

use super::{AcquisitionFileIO, C3DFileIO, FileIOHandle};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

type Constructor = fn() -> FileIOHandle;

fn c3d() -> FileIOHandle {
    Rc::new(RefCell::new(C3DFileIO::new()))
}

const REGISTERED: &[(&str, Constructor)] = &[("C3D", c3d)];

/// Creates the codec able to handle a file
pub struct AcquisitionFileIOFactory;

impl AcquisitionFileIOFactory {
    /// Codec whose `can_read_file` accepts the content of `path`
    pub fn create_for_read(path: &Path) -> Option<FileIOHandle> {
        Self::probe(path, |io, p| io.can_read_file(p))
    }

    /// Codec whose `can_write_file` accepts `path`
    pub fn create_for_write(path: &Path) -> Option<FileIOHandle> {
        Self::probe(path, |io, p| io.can_write_file(p))
    }

    /// Names of the registered codecs
    pub fn formats() -> Vec<&'static str> {
        REGISTERED.iter().map(|(name, _)| *name).collect()
    }

    fn probe(path: &Path, accepts: impl Fn(&dyn AcquisitionFileIO, &Path) -> bool) -> Option<FileIOHandle> {
        let found = REGISTERED.iter().find_map(|(name, make)| {
            let io = make();
            let accepted = accepts(&*io.borrow(), path);
            accepted.then(|| {
                tracing::debug!("{} codec selected for '{}'", name, path.display());
                io
            })
        });
        if found.is_none() {
            tracing::debug!("No codec accepts '{}'", path.display());
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Acquisition;
    use tempfile::TempDir;

    #[test]
    fn test_write_selection_by_extension() {
        assert!(AcquisitionFileIOFactory::create_for_write(Path::new("out.c3d")).is_some());
        assert!(AcquisitionFileIOFactory::create_for_write(Path::new("out.trc")).is_none());
        assert_eq!(AcquisitionFileIOFactory::formats(), vec!["C3D"]);
    }

    #[test]
    fn test_read_selection_by_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no_extension");
        C3DFileIO::new().write(&path, &Acquisition::new()).unwrap();
        assert!(AcquisitionFileIOFactory::create_for_read(&path).is_some());

        let text = dir.path().join("notes.c3d");
        std::fs::write(&text, "hello").unwrap();
        assert!(AcquisitionFileIOFactory::create_for_read(&text).is_none());
    }
}
