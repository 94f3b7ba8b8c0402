use crate::domain::model::{BindBody, DeleteParams, ProvisionBody};
use crate::utils::error::{BrokerError, Result, ValidationError};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use url::Url;

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("UUID pattern is a valid regex")
});

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 標準小寫 8-4-4-4-12 格式的 UUID
pub fn is_uuid(value: &str) -> bool {
    UUID_PATTERN.is_match(value)
}

/// 先檢查所有必填欄位，全部存在後才檢查 UUID 格式
pub fn validate_fields(
    required: &[&str],
    identifiers: &[&str],
) -> std::result::Result<(), ValidationError> {
    if required.iter().chain(identifiers).any(|field| field.is_empty()) {
        return Err(ValidationError::MissingField);
    }

    if !identifiers.iter().all(|id| is_uuid(id)) {
        return Err(ValidationError::MalformedIdentifier);
    }

    Ok(())
}

pub fn validate_provision(
    instance_id: &str,
    body: &ProvisionBody,
) -> std::result::Result<(), ValidationError> {
    validate_fields(
        &[],
        &[
            body.service_id.as_str(),
            body.plan_id.as_str(),
            body.organization_id.as_str(),
            body.space_id.as_str(),
            instance_id,
        ],
    )
}

/// 資料庫名稱、帳號與密碼只要求非空，不檢查格式
pub fn validate_bind(
    instance_id: &str,
    binding_id: &str,
    body: &BindBody,
) -> std::result::Result<(), ValidationError> {
    validate_fields(
        &[
            body.database.name.as_str(),
            body.database.username.as_str(),
            body.database.password.as_str(),
        ],
        &[body.service_id.as_str(), body.plan_id.as_str(), instance_id, binding_id],
    )
}

pub fn validate_unbind(
    instance_id: &str,
    binding_id: &str,
    params: &DeleteParams,
) -> std::result::Result<(), ValidationError> {
    validate_fields(
        &[],
        &[instance_id, binding_id, params.service_id.as_str(), params.plan_id.as_str()],
    )
}

pub fn validate_deprovision(
    instance_id: &str,
    params: &DeleteParams,
) -> std::result::Result<(), ValidationError> {
    validate_fields(&[], &[instance_id, params.service_id.as_str(), params.plan_id.as_str()])
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(BrokerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(BrokerError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(BrokerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

/// 憑證檔路徑必須提供且存在於檔案系統
pub fn validate_existing_file(field_name: &str, path: Option<&Path>) -> Result<()> {
    let path = path.ok_or_else(|| BrokerError::MissingConfigError {
        field: field_name.to_string(),
    })?;

    if !path.is_file() {
        return Err(BrokerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.display().to_string(),
            reason: "The file does not exist in the filesystem".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BrokerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(BrokerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
