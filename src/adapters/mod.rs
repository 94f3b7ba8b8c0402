// Adapters layer: concrete implementations of the domain ports.

pub mod docker;

pub use docker::DockerCli;
