pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod security;
pub mod utils;

pub use adapters::DockerCli;
pub use api::create_router;
pub use config::{BrokerConfig, CliArgs};
pub use crate::core::{PortAllocator, ServiceBroker};
pub use domain::ports::ContainerRuntime;
pub use utils::error::{BrokerError, Result};
