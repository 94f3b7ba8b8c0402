use serde::{Deserialize, Serialize};
use std::fmt;

/// 會呼叫容器執行環境的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Provision,
    Deprovision,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verb::Provision => "provision",
            Verb::Deprovision => "deprovision",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionBody {
    pub service_id: String,
    pub plan_id: String,
    #[serde(rename = "organization_guid")]
    pub organization_id: String,
    #[serde(rename = "space_guid")]
    pub space_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindBody {
    pub service_id: String,
    pub plan_id: String,
    #[serde(rename = "parameters")]
    pub database: DatabaseParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseParameters {
    pub name: String,
    pub username: String,
    pub password: String,
}

/// DELETE 操作從 query string 讀取的參數
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeleteParams {
    pub service_id: String,
    pub plan_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionResponse {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dashboard_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub operation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprovisionResponse {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub operation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindResponse {
    pub credentials: Credentials,
}

/// Unbind 成功時回傳空物件 `{}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbindResponse {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub connection_string: String,
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub database_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    pub bindable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_client: Option<serde_json::Value>,
    pub plan_updateable: bool,
    pub plans: Vec<ServicePlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePlan {
    pub name: String,
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub free: bool,
    pub bindable: bool,
}

/// 建立容器所需的參數
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub host_port: u16,
    pub container_port: u16,
}

impl ContainerSpec {
    /// `docker run -p` 使用的 `host:container` 格式
    pub fn port_mapping(&self) -> String {
        format!("{}:{}", self.host_port, self.container_port)
    }
}
