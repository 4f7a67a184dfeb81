//! INI file configuration adapter.

use crate::domain::error::SignalbenchError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SignalbenchError> {
        let path = path.as_ref();
        let parse_err = |reason: String| SignalbenchError::ConfigParse {
            file: path.display().to_string(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| parse_err(e.to_string()))?;
        let mut config = Ini::new();
        config.read(content).map_err(parse_err)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, SignalbenchError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| SignalbenchError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    /// Blank values read as absent.
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}
