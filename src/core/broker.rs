use crate::config::{BrokerConfig, BrokerSettings, RuntimeConfig};
use crate::core::port_allocator::PortAllocator;
use crate::domain::catalog;
use crate::domain::model::{
    BindBody, BindResponse, Catalog, ContainerSpec, Credentials, DeleteParams, DeprovisionResponse,
    ProvisionBody, ProvisionResponse, UnbindResponse, Verb,
};
use crate::domain::ports::ContainerRuntime;
use crate::utils::error::{BrokerError, Result};
use crate::utils::validation::{
    validate_bind, validate_deprovision, validate_provision, validate_unbind,
};
use std::sync::Arc;

/// 把每個 broker 操作對應到容器執行環境上的動作
///
/// 不保存任何實例狀態：實例是否存在完全由容器名稱
/// (`container_prefix` + instance id) 在執行環境中決定。
pub struct ServiceBroker<R: ContainerRuntime> {
    runtime: Arc<R>,
    allocator: PortAllocator<R>,
    runtime_config: RuntimeConfig,
    settings: BrokerSettings,
}

impl<R: ContainerRuntime> ServiceBroker<R> {
    pub fn new(runtime: Arc<R>, runtime_config: RuntimeConfig, settings: BrokerSettings) -> Self {
        let allocator = PortAllocator::new(Arc::clone(&runtime), runtime_config.base_port);
        Self {
            runtime,
            allocator,
            runtime_config,
            settings,
        }
    }

    pub fn from_config(runtime: Arc<R>, config: &BrokerConfig) -> Self {
        Self::new(runtime, config.runtime.clone(), config.broker.clone())
    }

    pub fn container_name(&self, instance_id: &str) -> String {
        format!("{}{}", self.runtime_config.container_prefix, instance_id)
    }

    pub fn catalog(&self) -> Catalog {
        catalog::catalog()
    }

    pub async fn provision(
        &self,
        instance_id: &str,
        body: &ProvisionBody,
    ) -> Result<ProvisionResponse> {
        validate_provision(instance_id, body)?;

        let container_name = self.container_name(instance_id);
        let lease = self.allocator.allocate().await.map_err(|e| {
            tracing::error!(container = %container_name, "❌ Port allocation failed: {}", e);
            BrokerError::from(e)
        })?;

        let spec = ContainerSpec {
            name: container_name.clone(),
            image: self.runtime_config.image.clone(),
            host_port: lease.port(),
            container_port: self.runtime_config.container_port,
        };

        // 同名容器已存在時由執行環境回報失敗，這裡不做冪等處理
        if let Err(e) = self.runtime.run_container(&spec).await {
            tracing::error!(container = %container_name, "❌ Container creation failed: {}", e);
            return Err(BrokerError::runtime(Verb::Provision, e));
        }
        lease.commit();

        tracing::info!(
            container = %container_name,
            host_port = spec.host_port,
            "✅ The database service has been created successfully"
        );

        Ok(ProvisionResponse {
            dashboard_url: self.settings.dashboard_url.clone(),
            operation: self.settings.operation.clone(),
        })
    }

    /// 只驗證並組出憑證，不會真的在資料庫中建立使用者
    pub fn bind(
        &self,
        instance_id: &str,
        binding_id: &str,
        body: &BindBody,
    ) -> Result<BindResponse> {
        validate_bind(instance_id, binding_id, body)?;

        let database = &body.database;
        let credentials = Credentials {
            connection_string: format!(
                "MONGO_URL=mongodb://{}:{}@HOSTNAME:{}/{}",
                database.username,
                database.password,
                self.runtime_config.container_port,
                database.name
            ),
            username: database.username.clone(),
            password: database.password.clone(),
            hostname: String::new(),
            database_name: database.name.clone(),
        };

        tracing::info!(
            instance = instance_id,
            binding = binding_id,
            "✅ The credentials for the service have been generated"
        );

        Ok(BindResponse { credentials })
    }

    pub fn unbind(
        &self,
        instance_id: &str,
        binding_id: &str,
        params: &DeleteParams,
    ) -> Result<UnbindResponse> {
        validate_unbind(instance_id, binding_id, params)?;

        tracing::info!(
            instance = instance_id,
            binding = binding_id,
            "✅ The resources associated to the binding have been released"
        );

        Ok(UnbindResponse {})
    }

    /// 不先檢查容器是否存在；找不到容器同樣視為執行環境錯誤
    pub async fn deprovision(
        &self,
        instance_id: &str,
        params: &DeleteParams,
    ) -> Result<DeprovisionResponse> {
        validate_deprovision(instance_id, params)?;

        let container_name = self.container_name(instance_id);
        if let Err(e) = self.runtime.remove_container(&container_name).await {
            tracing::error!(container = %container_name, "❌ Container removal failed: {}", e);
            return Err(BrokerError::runtime(Verb::Deprovision, e));
        }

        tracing::info!(
            container = %container_name,
            "✅ The database service has been deleted successfully"
        );

        Ok(DeprovisionResponse {
            operation: self.settings.operation.clone(),
        })
    }
}
