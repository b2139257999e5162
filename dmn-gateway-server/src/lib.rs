//! DMN Gateway Server - gRPC front end for the Dinner decision model
//!
//! Exposes `dinner.v1.Dinner/Process`, which evaluates the Dinner model via
//! [`dmn_gateway_core`] and returns a typed `DinnerOutput`.
//!
//! # Usage
//!
//! ```ignore
//! let config = GatewayConfig::load()?;
//! let gateway = Arc::new(build_gateway(&config));
//! serve(config.listen_addr(), gateway, shutdown_signal()).await?;
//! ```

pub mod config;
pub mod dinner;
pub mod proto;
pub mod server;

pub use config::GatewayConfig;
pub use server::{build_gateway, serve, serve_with_listener, shutdown_signal, DinnerService};
