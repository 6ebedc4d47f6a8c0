use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::io::prelude::*;
use std::io::ErrorKind;
use std::path::Path;

/// What to do with a hole ring for which no enclosing shell can be found.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnmatchedHolePolicy {
    /// Leave the ring out of the materialized geometry.
    Drop,
    /// Emit the ring as an independent shell.
    PromoteToShell,
}

impl Default for UnmatchedHolePolicy {
    fn default() -> UnmatchedHolePolicy {
        UnmatchedHolePolicy::Drop
    }
}

/// Reader/writer settings. Usually left at their defaults, but can be backed by a
/// JSON settings file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Configs {
    /// Emit progress through the `LogProgress` handler and extra debug output.
    pub verbose_mode: bool,
    /// Reject .shp/.shx headers whose file code is not 9994.
    pub strict_file_code: bool,
    pub unmatched_holes: UnmatchedHolePolicy,
    /// Size, in bytes, of the windows used by the buffered reader and writer.
    pub buffer_size: usize,
}

impl Configs {
    pub fn new() -> Configs {
        Configs {
            verbose_mode: false,
            strict_file_code: true,
            unmatched_holes: UnmatchedHolePolicy::Drop,
            buffer_size: 1 << 20,
        }
    }

    pub fn from_json(contents: &str) -> Result<Configs> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for Configs {
    fn default() -> Configs {
        Configs::new()
    }
}

/// Reads settings from a JSON file. A missing file yields the defaults; any
/// other read failure is returned.
pub fn load_configs<P: AsRef<Path>>(config_file: P) -> Result<Configs> {
    let configs = match fs::read_to_string(config_file) {
        Ok(contents) => Configs::from_json(&contents)?,
        Err(e) if e.kind() == ErrorKind::NotFound => Configs::new(),
        Err(e) => return Err(e.into()),
    };
    Ok(configs)
}

pub fn save_configs<P: AsRef<Path>>(config_file: P, configs: &Configs) -> Result<()> {
    let configs_json = configs.to_json()?;
    let mut file = File::create(config_file)?;
    file.write_all(configs_json.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{load_configs, save_configs, Configs, UnmatchedHolePolicy};
    use crate::error::ShapefileError;

    #[test]
    fn test_partial_json_uses_defaults() {
        let configs = Configs::from_json(r#"{ "unmatched_holes": "PromoteToShell" }"#).unwrap();
        assert_eq!(configs.unmatched_holes, UnmatchedHolePolicy::PromoteToShell);
        assert!(configs.strict_file_code);
        assert_eq!(configs.buffer_size, Configs::new().buffer_size);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let configs = load_configs(dir.path().join("settings.json")).unwrap();
        assert_eq!(configs, Configs::default());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // a directory exists but cannot be read as a settings file
        match load_configs(dir.path()) {
            Err(ShapefileError::Io(e)) => assert_ne!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut configs = Configs::new();
        configs.verbose_mode = true;
        configs.buffer_size = 4096;
        save_configs(&path, &configs).unwrap();
        assert_eq!(load_configs(&path).unwrap(), configs);
    }
}
