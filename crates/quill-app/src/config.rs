// Configuration loading and parsing (assistant.toml, credentials.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use quill_llm::LlmSettings;
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub llm: LlmSettings,
    pub resolver: ResolverSettings,
    pub calibration: CalibrationSettings,
    pub library: LibrarySettings,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// assistant.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire assistant.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AssistantFile {
    llm: LlmSettings,
    resolver: ResolverSettings,
    calibration: CalibrationSettings,
    library: LibrarySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolverSettings {
    /// Excerpts with fewer characters than this yield no keywords.
    pub min_keyword_chars: usize,
    /// Characters of the excerpt sent as context for citation generation.
    pub context_chars: usize,
    pub quiet_period_secs: u64,
}

impl ResolverSettings {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_secs(self.quiet_period_secs)
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        ResolverSettings {
            min_keyword_chars: 20,
            context_chars: 500,
            quiet_period_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CalibrationSettings {
    pub min_sample_chars: usize,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        CalibrationSettings {
            min_sample_chars: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LibrarySettings {
    pub upload_preview_chars: usize,
    /// Start the session with the built-in seed library.
    #[serde(default = "default_seed")]
    pub seed: bool,
}

fn default_seed() -> bool {
    true
}

impl Default for LibrarySettings {
    fn default() -> Self {
        LibrarySettings {
            upload_preview_chars: 1000,
            seed: default_seed(),
        }
    }
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub anthropic_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/assistant.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; `load_config_in()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- assistant.toml (required) ---
    let assistant_path = config_dir.join("assistant.toml");
    let assistant_text = read_file(&assistant_path)?;
    let assistant: AssistantFile =
        toml::from_str(&assistant_text).map_err(|e| ConfigError::ParseError {
            path: assistant_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        llm: assistant.llm,
        resolver: assistant.resolver,
        calibration: assistant.calibration,
        library: assistant.library,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files and
/// never overwrites an existing file.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Seed missing files from `defaults/`, then load, all relative to `base_dir`.
pub fn load_config_in(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.llm.model.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "llm.model".into(),
            message: "must not be empty".into(),
        });
    }

    let llm = &config.llm;
    let token_fields: &[(&str, u32)] = &[
        ("llm.keywords_max_tokens", llm.keywords_max_tokens),
        ("llm.citations_max_tokens", llm.citations_max_tokens),
        ("llm.analysis_max_tokens", llm.analysis_max_tokens),
        ("llm.sample_max_tokens", llm.sample_max_tokens),
    ];
    for (name, val) in token_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    if config.resolver.quiet_period_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "resolver.quiet_period_secs".into(),
            message: "must be > 0".into(),
        });
    }

    let size_fields: &[(&str, usize)] = &[
        ("resolver.context_chars", config.resolver.context_chars),
        ("library.upload_preview_chars", config.library.upload_preview_chars),
    ];
    for (name, val) in size_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// The workspace root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    /// A scratch base directory containing `config/assistant.toml` copied
    /// from the shipped defaults, with `edit` applied to its text.
    fn scratch_base(name: &str, edit: impl Fn(String) -> String) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let text = fs::read_to_string(project_root().join("defaults/assistant.toml")).unwrap();
        fs::write(config_dir.join("assistant.toml"), edit(text)).unwrap();
        tmp
    }

    fn expect_validation_error(base: &Path, expected_field: &str) {
        match load_config_from(base).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected_field),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_shipped_defaults() {
        let base = scratch_base("quill_config_defaults", |t| t);
        let config = load_config_from(&base).expect("should load shipped defaults");

        assert_eq!(config.llm.model, "claude-sonnet-4-5-20250929");
        assert_eq!(config.llm.citations_max_tokens, 800);
        assert_eq!(config.resolver, ResolverSettings::default());
        assert_eq!(config.resolver.quiet_period(), Duration::from_secs(30));
        assert_eq!(config.calibration.min_sample_chars, 50);
        assert_eq!(config.library, LibrarySettings::default());
        assert!(config.credentials.anthropic_api_key.is_none());

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn missing_seed_key_means_seeded() {
        let base = scratch_base("quill_config_seed_missing", |t| t.replace("seed = true", ""));
        let config = load_config_from(&base).expect("seed is optional");
        assert!(config.library.seed);
        assert_eq!(config.library, LibrarySettings::default());
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn seed_can_be_disabled() {
        let base = scratch_base("quill_config_seed_off", |t| t.replace("seed = true", "seed = false"));
        assert!(!load_config_from(&base).unwrap().library.seed);
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn credentials_toml_with_api_key() {
        let base = scratch_base("quill_config_creds", |t| t);
        fs::write(
            base.join("config/credentials.toml"),
            "anthropic_api_key = \"sk-ant-test-key\"\n",
        )
        .unwrap();

        let config = load_config_from(&base).expect("should load with credentials.toml");
        assert_eq!(
            config.credentials.anthropic_api_key.as_deref(),
            Some("sk-ant-test-key")
        );

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn missing_assistant_toml_is_reported() {
        let tmp = std::env::temp_dir().join("quill_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("assistant.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let base = scratch_base("quill_config_parse", |t| t.replace("[resolver]", "[resolver"));
        assert!(matches!(
            load_config_from(&base).unwrap_err(),
            ConfigError::ParseError { .. }
        ));
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rejects_zero_quiet_period() {
        let base = scratch_base("quill_config_quiet_zero", |t| {
            t.replace("quiet_period_secs = 30", "quiet_period_secs = 0")
        });
        expect_validation_error(&base, "resolver.quiet_period_secs");
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rejects_zero_max_tokens() {
        let base = scratch_base("quill_config_tokens_zero", |t| {
            t.replace("sample_max_tokens = 400", "sample_max_tokens = 0")
        });
        expect_validation_error(&base, "llm.sample_max_tokens");
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rejects_zero_preview_length() {
        let base = scratch_base("quill_config_preview_zero", |t| {
            t.replace("upload_preview_chars = 1000", "upload_preview_chars = 0")
        });
        expect_validation_error(&base, "library.upload_preview_chars");
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn ensure_config_files_copies_once_and_skips_templates() {
        let tmp = std::env::temp_dir().join("quill_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            project_root().join("defaults/assistant.toml"),
            tmp.join("defaults/assistant.toml"),
        )
        .unwrap();
        fs::write(tmp.join("defaults/credentials.toml.example"), "x = 1\n").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, vec![tmp.join("config/assistant.toml")]);
        assert!(!tmp.join("config/credentials.toml.example").exists());

        // Existing files are left alone.
        fs::write(tmp.join("config/assistant.toml"), "edited").unwrap();
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        assert_eq!(
            fs::read_to_string(tmp.join("config/assistant.toml")).unwrap(),
            "edited"
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_without_any_dirs_fails() {
        let tmp = std::env::temp_dir().join("quill_config_nothing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_config_files(&tmp).unwrap_err(),
            ConfigError::DefaultsCopyError { .. }
        ));
        let _ = fs::remove_dir_all(&tmp);
    }
}
