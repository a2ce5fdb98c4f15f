//! Persistencia Diesel para el trait `WorkflowRepository`.
//! Este archivo expone el módulo `schema`, la configuración por entorno y
//! reexporta el repositorio. La implementación detallada está en
//! `workflow_persistence.rs`.

pub mod config;
pub mod schema;
mod workflow_persistence;

pub use config::FlowDbConfig;
#[cfg(not(feature = "pg"))]
pub use workflow_persistence::new_sqlite;
pub use workflow_persistence::{new_from_env, DieselWorkflowRepository, MIGRATIONS};
