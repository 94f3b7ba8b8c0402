use crate::domain::model::Verb;
use axum::http::StatusCode;
use thiserror::Error;

pub const MISSING_FIELD_DESCRIPTION: &str = "The field is required and cannot be null/empty";
pub const MALFORMED_ID_DESCRIPTION: &str = "The input provided is not a valid UUID.";
pub const EMPTY_BODY_DESCRIPTION: &str = "Please send a request body.";
pub const MALFORMED_BODY_DESCRIPTION: &str = "The request body is not valid JSON.";
pub const PROVISION_ERROR_DESCRIPTION: &str = "Error creating the database service.";
pub const DEPROVISION_ERROR_DESCRIPTION: &str = "Error deleting the database service.";
pub const INTERNAL_ERROR_DESCRIPTION: &str = "Internal broker error.";

/// 請求驗證失敗的分類，描述會原樣回傳給呼叫端
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{}", MISSING_FIELD_DESCRIPTION)]
    MissingField,

    #[error("{}", MALFORMED_ID_DESCRIPTION)]
    MalformedIdentifier,

    #[error("{}", EMPTY_BODY_DESCRIPTION)]
    EmptyBody,

    #[error("{}", MALFORMED_BODY_DESCRIPTION)]
    MalformedBody,
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` did not finish within {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("runtime query failed: {0}")]
    Query(#[from] RuntimeError),

    #[error("no host port left above {last}")]
    Exhausted { last: String },
}

/// 憑證材料不符合密碼學政策時的錯誤，啟動時遇到即中止
#[derive(Error, Debug)]
pub enum TrustError {
    #[error("failed to load {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("the private key does not match the certificate public key")]
    KeyMismatch,

    #[error("unsupported private key signature ({algorithm}), only RSA is valid")]
    UnsupportedSignature { algorithm: String },

    #[error("validating certificate length, expected {required} bits but the key is {actual}")]
    KeyTooWeak { required: usize, actual: usize },

    #[error("x509: {algorithm} is an unsupported signature hash algorithm")]
    UnsupportedDigest { algorithm: String },

    #[error("failed to build the TLS server configuration: {0}")]
    Transport(#[from] rustls::Error),
}

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Port allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Container runtime failed during {verb}: {source}")]
    Runtime {
        verb: Verb,
        #[source]
        source: RuntimeError,
    },

    #[error("TLS trust error: {0}")]
    Trust(#[from] TrustError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl BrokerError {
    pub fn runtime(verb: Verb, source: RuntimeError) -> Self {
        BrokerError::Runtime { verb, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BrokerError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 回傳給呼叫端的描述；內部原因只寫入日誌
    pub fn client_description(&self) -> String {
        match self {
            BrokerError::Validation(e) => e.to_string(),
            BrokerError::Allocation(_) => PROVISION_ERROR_DESCRIPTION.to_string(),
            BrokerError::Runtime { verb, .. } => match verb {
                Verb::Provision => PROVISION_ERROR_DESCRIPTION.to_string(),
                Verb::Deprovision => DEPROVISION_ERROR_DESCRIPTION.to_string(),
            },
            _ => INTERNAL_ERROR_DESCRIPTION.to_string(),
        }
    }

    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            BrokerError::Trust(_)
                | BrokerError::ConfigError { .. }
                | BrokerError::InvalidConfigValueError { .. }
                | BrokerError::MissingConfigError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;
