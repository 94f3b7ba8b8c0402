pub mod broker;
pub mod port_allocator;

pub use broker::ServiceBroker;
pub use port_allocator::{PortAllocator, PortLease};
