use crate::error::Result;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Where a shapefile's coordinate reference system text lives.
pub trait ProjectionStore {
    /// Returns the stored text, or `None` when there is none.
    fn open(&self, path: &Path) -> Result<Option<String>>;

    fn save(&self, path: &Path, projection: &str) -> Result<()>;
}

/// The plain-text .prj file next to the .shp.
#[derive(Debug, Default, Copy, Clone)]
pub struct PrjFile;

impl ProjectionStore for PrjFile {
    fn open(&self, path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path.with_extension("prj")) {
            Ok(contents) => Ok(Some(contents.trim_end().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, path: &Path, projection: &str) -> Result<()> {
        fs::write(path.with_extension("prj"), projection)?;
        Ok(())
    }
}
