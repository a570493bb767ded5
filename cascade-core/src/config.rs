//! # Configuração
//!
//! Lida de um arquivo TOML; toda seção é opcional e tem valores padrão:
//!
//! ```toml
//! [model]
//! stage1 = "models/stage1.json"
//! stage2 = "models/stage2.json"
//!
//! [decoder]
//! window = 2
//! parallel = false
//!
//! [features]
//! gazetteers_dir = "gazetteers"
//! shape_max_repeats = 4
//!
//! [batch]
//! parallel = true
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```
//!
//! Caminhos relativos são resolvidos a partir do diretório do arquivo de
//! configuração.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::decoder::DecoderConfig;
use crate::error::ConfigError;

/// Configuração completa do etiquetador.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    pub model: ModelConfig,
    pub decoder: DecoderConfig,
    pub features: FeaturesConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

/// Arquivos de pesos dos dois classificadores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub stage1: PathBuf,
    pub stage2: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            stage1: PathBuf::from("models/stage1.json"),
            stage2: PathBuf::from("models/stage2.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Diretório com uma lista por categoria; sem ele, nenhum gazetteer.
    pub gazetteers_dir: Option<PathBuf>,
    pub shape_max_repeats: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Processa os arquivos de um diretório em paralelo.
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// "trace", "debug", "info", "warn" ou "error"
    pub level: String,
    /// "pretty" ou "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

impl TaggerConfig {
    /// Lê e valida um arquivo de configuração.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Um caminho explícito precisa existir. Sem ele, `fallback` é lido se
    /// existir; senão valem os padrões.
    pub fn load_or_default(explicit: Option<&Path>, fallback: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path),
            None if fallback.exists() => Self::load_from(fallback),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Validation(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decoder.window == 0 {
            return Err(ConfigError::Validation(
                "decoder.window must be > 0".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {LOG_LEVELS:?}, got {:?}",
                self.logging.level
            )));
        }
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.format must be one of {LOG_FORMATS:?}, got {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.model.stage1);
        resolve(&mut self.model.stage2);
        if let Some(dir) = self.features.gazetteers_dir.as_mut() {
            resolve(dir);
        }
    }
}
