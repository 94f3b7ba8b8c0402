// Domain layer: broker models, the static catalog and the container runtime port.

pub mod catalog;
pub mod model;
pub mod ports;
