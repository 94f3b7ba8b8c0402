pub mod cli;

use crate::core::port_allocator::BASE_PORT;
use crate::utils::error::{BrokerError, Result};
use crate::utils::validation::{
    validate_existing_file, validate_non_empty_string, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use cli::CliArgs;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub server: ServerConfig,
    pub tls: TlsConfig,
    pub runtime: RuntimeConfig,
    pub broker: BrokerSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub binary: String,
    pub image: String,
    pub container_prefix: String,
    pub container_port: u16,
    pub base_port: u16,
    pub command_timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            image: "mongo".to_string(),
            container_prefix: "cf-mongo-".to_string(),
            container_port: 27017,
            base_port: BASE_PORT,
            command_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub dashboard_url: String,
    pub operation: String,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            dashboard_url: "https://dashboard.example.com".to_string(),
            operation: "task_01".to_string(),
        }
    }
}

impl ServerConfig {
    /// 未設定時使用預設埠並記錄警告
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| {
            tracing::warn!(
                "No listening port configured (CF_NOSQL_BROKER_PORT), defaulting to: {}",
                DEFAULT_PORT
            );
            DEFAULT_PORT
        })
    }
}

impl BrokerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BrokerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BrokerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CF_NOSQL_BROKER_CERT})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BrokerError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn cert_path(&self) -> Option<&Path> {
        self.tls.cert_path.as_deref()
    }

    pub fn key_path(&self) -> Option<&Path> {
        self.tls.key_path.as_deref()
    }
}

impl Validate for BrokerConfig {
    fn validate(&self) -> Result<()> {
        // 缺少任何一個憑證檔都不能啟動
        validate_existing_file("tls.key_path", self.key_path())?;
        validate_existing_file("tls.cert_path", self.cert_path())?;

        validate_url("broker.dashboard_url", &self.broker.dashboard_url)?;
        validate_non_empty_string("broker.operation", &self.broker.operation)?;

        validate_non_empty_string("runtime.binary", &self.runtime.binary)?;
        validate_non_empty_string("runtime.image", &self.runtime.image)?;
        validate_non_empty_string("runtime.container_prefix", &self.runtime.container_prefix)?;
        validate_range("runtime.container_port", self.runtime.container_port, 1, u16::MAX)?;
        validate_range("runtime.base_port", self.runtime.base_port, 1024, u16::MAX)?;
        validate_range(
            "runtime.command_timeout_secs",
            self.runtime.command_timeout_secs,
            1,
            3600,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = BrokerConfig::default();

        assert_eq!(config.server.port, None);
        assert_eq!(config.server.port(), DEFAULT_PORT);
        assert_eq!(config.runtime.binary, "docker");
        assert_eq!(config.runtime.image, "mongo");
        assert_eq!(config.runtime.container_prefix, "cf-mongo-");
        assert_eq!(config.runtime.container_port, 27017);
        assert_eq!(config.runtime.base_port, 59000);
        assert_eq!(config.broker.operation, "task_01");
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[server]
port = 8443

[runtime]
image = "mongo:7"
command_timeout_secs = 10
"#;

        let config = BrokerConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.port(), 8443);
        assert_eq!(config.runtime.image, "mongo:7");
        assert_eq!(config.runtime.command_timeout_secs, 10);
        assert_eq!(config.runtime.container_prefix, "cf-mongo-");
        assert!(config.tls.cert_path.is_none());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("NOSQL_BROKER_TEST_IMAGE", "mongo:6");

        let toml_content = r#"
[runtime]
image = "${NOSQL_BROKER_TEST_IMAGE}"
binary = "${NOSQL_BROKER_TEST_UNSET_BINARY}"
"#;

        let config = BrokerConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.runtime.image, "mongo:6");
        assert_eq!(config.runtime.binary, "${NOSQL_BROKER_TEST_UNSET_BINARY}");

        std::env::remove_var("NOSQL_BROKER_TEST_IMAGE");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = BrokerConfig::from_toml_str("[server\nport = 1");
        assert!(matches!(result, Err(BrokerError::ConfigError { .. })));
    }

    #[test]
    fn test_validation_requires_credentials() {
        let config = BrokerConfig::default();
        assert!(matches!(
            config.validate(),
            Err(BrokerError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_validation_with_existing_credentials() {
        let cert = write_file("cert");
        let key = write_file("key");

        let mut config = BrokerConfig::default();
        config.tls.cert_path = Some(cert.path().to_path_buf());
        config.tls.key_path = Some(key.path().to_path_buf());
        assert!(config.validate().is_ok());

        config.broker.dashboard_url = "dashboard".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_missing_cert_file() {
        let key = write_file("key");

        let mut config = BrokerConfig::default();
        config.tls.cert_path = Some(PathBuf::from("/nonexistent/broker.crt"));
        config.tls.key_path = Some(key.path().to_path_buf());
        assert!(matches!(
            config.validate(),
            Err(BrokerError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let file = write_file(
            r#"
[tls]
cert_path = "/etc/broker/tls.crt"
key_path = "/etc/broker/tls.key"

[broker]
dashboard_url = "https://mongo.example.org"
"#,
        );

        let config = BrokerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cert_path(), Some(Path::new("/etc/broker/tls.crt")));
        assert_eq!(config.key_path(), Some(Path::new("/etc/broker/tls.key")));
        assert_eq!(config.broker.dashboard_url, "https://mongo.example.org");
    }
}
