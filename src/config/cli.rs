use super::BrokerConfig;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "nosql-broker")]
#[command(about = "NoSQL service broker backed by local containers")]
pub struct CliArgs {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// HTTPS listening port
    #[arg(long, env = "CF_NOSQL_BROKER_PORT")]
    pub port: Option<u16>,

    /// PEM certificate chain served to clients
    #[arg(long, env = "CF_NOSQL_BROKER_CERT")]
    pub cert: Option<PathBuf>,

    /// PEM private key matching the certificate
    #[arg(long, env = "CF_NOSQL_BROKER_KEY")]
    pub key: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl CliArgs {
    /// 合併配置檔與命令列 / 環境變數，後者優先
    pub fn resolve(&self) -> Result<BrokerConfig> {
        let mut config = match &self.config {
            Some(path) => BrokerConfig::from_file(path)?,
            None => BrokerConfig::default(),
        };

        if let Some(port) = self.port {
            config.server.port = Some(port);
        }
        if let Some(cert) = &self.cert {
            config.tls.cert_path = Some(cert.clone());
        }
        if let Some(key) = &self.key {
            config.tls.key_path = Some(key.clone());
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_flags_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
[server]
port = 9443

[tls]
cert_path = "/from/file.crt"
key_path = "/from/file.key"
"#,
        )
        .unwrap();

        let args = CliArgs::try_parse_from([
            "nosql-broker",
            "--config",
            file.path().to_str().unwrap(),
            "--port",
            "8443",
            "--cert",
            "/from/flag.crt",
        ])
        .unwrap();

        let config = args.resolve().unwrap();
        assert_eq!(config.server.port, Some(8443));
        assert_eq!(config.tls.cert_path, Some(PathBuf::from("/from/flag.crt")));
        assert_eq!(config.tls.key_path, Some(PathBuf::from("/from/file.key")));
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let args =
            CliArgs::try_parse_from(["nosql-broker", "--config", "/nonexistent/broker.toml"])
                .unwrap();
        assert!(args.resolve().is_err());
    }
}
