pub mod tls;

pub use tls::{establish, harden, HardeningReport, TrustMaterial};
