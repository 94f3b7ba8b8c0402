#![allow(dead_code)]

use async_trait::async_trait;
use nosql_broker::config::{BrokerSettings, RuntimeConfig};
use nosql_broker::domain::model::ContainerSpec;
use nosql_broker::utils::error::RuntimeError;
use nosql_broker::{ContainerRuntime, ServiceBroker};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const SERVICE_ID: &str = "011ca270-ad21-44e2-95d6-60c70a840a80";
pub const PLAN_ID: &str = "4f79aa95-b5ca-4030-a263-c58cb2c61dfc";

/// 模擬容器執行環境：以容器名稱為唯一鍵
#[derive(Default)]
pub struct FakeRuntime {
    containers: Mutex<BTreeMap<String, u16>>,
}

impl FakeRuntime {
    pub fn container_names(&self) -> Vec<String> {
        self.containers.lock().unwrap().keys().cloned().collect()
    }

    pub fn host_port(&self, name: &str) -> Option<u16> {
        self.containers.lock().unwrap().get(name).copied()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn published_ports(&self) -> Result<String, RuntimeError> {
        let containers = self.containers.lock().unwrap();
        Ok(containers
            .values()
            .map(|port| format!("0.0.0.0:{port}->27017/tcp, :::{port}->27017/tcp\n"))
            .collect())
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        let mut containers = self.containers.lock().unwrap();
        if containers.contains_key(&spec.name) {
            return Err(RuntimeError::CommandFailed {
                command: format!("docker run -d --name {}", spec.name),
                status: "exit status: 125".to_string(),
                stderr: format!(
                    "docker: Error response from daemon: Conflict. The container name \"/{}\" is already in use.",
                    spec.name
                ),
            });
        }
        containers.insert(spec.name.clone(), spec.host_port);
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<(), RuntimeError> {
        if self.containers.lock().unwrap().remove(name).is_none() {
            return Err(RuntimeError::CommandFailed {
                command: format!("docker rm -f {}", name),
                status: "exit status: 1".to_string(),
                stderr: format!("Error response from daemon: No such container: {}", name),
            });
        }
        Ok(())
    }
}

pub fn broker() -> (Arc<FakeRuntime>, Arc<ServiceBroker<FakeRuntime>>) {
    let runtime = Arc::new(FakeRuntime::default());
    let broker = Arc::new(ServiceBroker::new(
        Arc::clone(&runtime),
        RuntimeConfig::default(),
        BrokerSettings::default(),
    ));
    (runtime, broker)
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn provision_body() -> serde_json::Value {
    serde_json::json!({
        "service_id": SERVICE_ID,
        "plan_id": PLAN_ID,
        "organization_guid": new_id(),
        "space_guid": new_id(),
    })
}

pub fn bind_body() -> serde_json::Value {
    serde_json::json!({
        "service_id": SERVICE_ID,
        "plan_id": PLAN_ID,
        "parameters": {
            "name": "inventory",
            "username": "inventory_app",
            "password": "correct-horse",
        }
    })
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
