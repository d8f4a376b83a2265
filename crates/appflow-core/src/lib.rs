//! Core logic and abstractions for the Appflow driver system.
//!
//! This crate defines the application descriptor model, the driver
//! lifecycle trait and registry, the template materializer, the
//! infrastructure directory seam, and the shared error and UI types
//! used across the Appflow workspace.

pub mod appfile;
pub mod assets;
pub mod constants;
pub mod context;
pub mod driver;
pub mod error;
pub mod fingerprint;
pub mod infra;
pub mod ui;

pub use appfile::Appfile;
pub use assets::{AssetSource, TemplateContext, TemplateValue};
pub use context::{AppContext, InfraTuple};
pub use driver::{AppDriver, CompileResult, DevDep, DriverRegistry};
pub use error::{DriverError, DriverResult};
pub use infra::{Directory, InfraId, InfraState, InfrastructureRecord};
pub use ui::Ui;
