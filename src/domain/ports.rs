use crate::domain::model::ContainerSpec;
use crate::utils::error::RuntimeError;
use async_trait::async_trait;

/// 容器執行環境的介面，代理只透過這三個操作與它互動
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// 所有執行中容器對外發布的埠，每個容器一行
    async fn published_ports(&self) -> Result<String, RuntimeError>;

    async fn run_container(&self, spec: &ContainerSpec) -> Result<(), RuntimeError>;

    /// 強制移除指定名稱的容器
    async fn remove_container(&self, name: &str) -> Result<(), RuntimeError>;
}
