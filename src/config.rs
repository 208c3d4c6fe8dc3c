use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const RESPONSE_FORMAT_VAR: &str = "RESPONSE_FORMAT";

pub const DEFAULT_RUNTIME: &str = "provided.al2";
pub const DEFAULT_ENTRYPOINT: &str = "bootstrap";
pub const DEFAULT_ARTIFACT: &str = "../handler.zip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownResponseFormat(String),
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownResponseFormat(value) => {
                write!(f, "unknown response format '{value}' (expected raw or json)")
            }
            ConfigError::Missing(field) => write!(f, "{field} must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// How the uppercased path is written into the response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Body is the uppercased string verbatim.
    #[default]
    Raw,
    /// Body is `{"result": "<uppercased>"}` with two-space indentation.
    Json,
}

impl FromStr for ResponseFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(ResponseFormat::Raw),
            "json" => Ok(ResponseFormat::Json),
            _ => Err(ConfigError::UnknownResponseFormat(value.to_string())),
        }
    }
}

impl ResponseFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ResponseFormat::Raw => "text/plain; charset=utf-8",
            ResponseFormat::Json => "application/json",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerConfig {
    pub response_format: ResponseFormat,
}

impl HandlerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let response_format = match env::var(RESPONSE_FORMAT_VAR) {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => ResponseFormat::default(),
        };

        Ok(Self { response_format })
    }
}

/// Deploy-time inputs. Every resource name is namespaced as
/// `<project>-<stack>-<suffix>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    pub project: String,
    pub stack: String,
    pub artifact: PathBuf,
    pub runtime: String,
    pub entrypoint: String,
}

impl StackConfig {
    pub fn new(
        project: impl Into<String>,
        stack: impl Into<String>,
        artifact: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            project: project.into(),
            stack: stack.into(),
            artifact: artifact.into(),
            runtime: DEFAULT_RUNTIME.to_string(),
            entrypoint: DEFAULT_ENTRYPOINT.to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.trim().is_empty() {
            return Err(ConfigError::Missing("project"));
        }
        if self.stack.trim().is_empty() {
            return Err(ConfigError::Missing("stack"));
        }
        if self.artifact.as_os_str().is_empty() {
            return Err(ConfigError::Missing("artifact"));
        }
        if self.runtime.trim().is_empty() {
            return Err(ConfigError::Missing("runtime"));
        }
        if self.entrypoint.trim().is_empty() {
            return Err(ConfigError::Missing("entrypoint"));
        }
        Ok(())
    }

    pub fn prefix(&self) -> String {
        format!("{}-{}", self.project, self.stack)
    }

    pub fn resource_name(&self, suffix: &str) -> String {
        format!("{}-{suffix}", self.prefix())
    }
}
