//! Configuration types for carbuf

use serde::{Deserialize, Serialize};

use crate::codec::format::MAX_TEXT_LEN;
use crate::codec::{DEFAULT_CAPACITY, FILE_IDENTIFIER_LEN, MAX_INITIAL_CAPACITY};
use crate::{CarbufError, Result};

/// How text that is not valid UTF-8 is presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMode {
    /// Fail with `InvalidText`
    #[default]
    Strict,
    /// Show the bytes with replacement characters
    Lenient,
}

/// Where decoded records are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sink {
    /// Standard output
    #[default]
    Console,
    /// `tracing` events at info level
    Log,
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Encoder settings
    #[serde(default)]
    pub encode: EncodeConfig,
    /// Decoder settings
    #[serde(default)]
    pub decode: DecodeConfig,
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Encoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeConfig {
    /// Starting size of the builder buffer
    #[serde(default = "default_capacity")]
    pub initial_capacity: usize,
    /// Longest text accepted, in bytes
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,
    /// 4-byte identifier written after the root offset
    #[serde(default)]
    pub file_identifier: Option<String>,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_max_text_len() -> usize {
    MAX_TEXT_LEN
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            max_text_len: MAX_TEXT_LEN,
            file_identifier: None,
        }
    }
}

impl EncodeConfig {
    /// The configured file identifier as raw bytes
    ///
    /// # Errors
    ///
    /// Returns error if the identifier is not exactly 4 bytes
    pub fn identifier(&self) -> Result<Option<[u8; FILE_IDENTIFIER_LEN]>> {
        self.file_identifier
            .as_deref()
            .map(parse_identifier)
            .transpose()
    }
}

/// Decoder settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Strict or lenient text presentation
    #[serde(default)]
    pub text_mode: TextMode,
    /// Read every field before presenting any of them
    #[serde(default)]
    pub verify: bool,
    /// Identifier the buffer must carry
    #[serde(default)]
    pub expected_identifier: Option<String>,
}

impl DecodeConfig {
    /// The expected file identifier as raw bytes
    ///
    /// # Errors
    ///
    /// Returns error if the identifier is not exactly 4 bytes
    pub fn identifier(&self) -> Result<Option<[u8; FILE_IDENTIFIER_LEN]>> {
        self.expected_identifier
            .as_deref()
            .map(parse_identifier)
            .transpose()
    }
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Console or log sink
    #[serde(default)]
    pub sink: Sink,
}

fn parse_identifier(identifier: &str) -> Result<[u8; FILE_IDENTIFIER_LEN]> {
    identifier.as_bytes().try_into().map_err(|_| {
        CarbufError::ConfigError(format!(
            "File identifier must be exactly {FILE_IDENTIFIER_LEN} bytes, got {:?}",
            identifier
        ))
    })
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CarbufError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| CarbufError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.encode.initial_capacity == 0 {
            return Err(CarbufError::ConfigError(
                "initial_capacity must be > 0".to_string(),
            ));
        }

        if self.encode.initial_capacity > MAX_INITIAL_CAPACITY {
            return Err(CarbufError::ConfigError(format!(
                "initial_capacity cannot exceed {MAX_INITIAL_CAPACITY}"
            )));
        }

        if self.encode.max_text_len > MAX_TEXT_LEN {
            return Err(CarbufError::ConfigError(format!(
                "max_text_len cannot exceed {MAX_TEXT_LEN}"
            )));
        }

        self.encode.identifier()?;
        self.decode.identifier()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_parse() {
        let config_toml = r#"
            [encode]
            initial_capacity = 256
            file_identifier = "CARS"

            [decode]
            text_mode = "lenient"
            verify = true

            [output]
            sink = "log"
        "#;

        let config: Config = toml::from_str(config_toml).unwrap();
        assert_eq!(config.encode.initial_capacity, 256);
        assert_eq!(config.encode.max_text_len, MAX_TEXT_LEN);
        assert_eq!(config.encode.identifier().unwrap(), Some(*b"CARS"));
        assert_eq!(config.decode.text_mode, TextMode::Lenient);
        assert!(config.decode.verify);
        assert_eq!(config.output.sink, Sink::Log);
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.encode.initial_capacity, DEFAULT_CAPACITY);
        assert_eq!(config.decode.text_mode, TextMode::Strict);
        assert_eq!(config.output.sink, Sink::Console);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        let config_toml = r#"
            [decode]
            expected_identifier = "CARS"
        "#;
        file.write_all(config_toml.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.decode.identifier().unwrap(), Some(*b"CARS"));
    }

    #[test]
    fn test_invalid_identifier() {
        let config_toml = r#"
            [encode]
            file_identifier = "CAR"
        "#;

        let config: Config = toml::from_str(config_toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(CarbufError::ConfigError(_))
        ));
    }

    #[test]
    fn test_invalid_capacity() {
        let config_toml = r#"
            [encode]
            initial_capacity = 0
        "#;

        let config: Config = toml::from_str(config_toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_capacity_rejected() {
        let config_toml = r#"
            [encode]
            initial_capacity = 1099511627776000
        "#;

        let config: Config = toml::from_str(config_toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(CarbufError::ConfigError(_))
        ));

        // encoding without validation clamps instead of allocating it all
        let car = crate::Car::new(crate::Manufacturer::new("McCar", 22), "Nugget", 2033);
        let buf = crate::encode_with(&config.encode, &car).unwrap();
        assert_eq!(crate::decode(&buf).unwrap().to_car().unwrap(), car);
    }
}
