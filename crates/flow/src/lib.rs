//! Crate `flow` — historial versionado de workflows
//!
//! Este crate define los tipos de dominio (`WorkflowMeta`,
//! `WorkflowVersion`), el contrato de persistencia `WorkflowRepository`, el
//! colaborador externo `AutomationClient` y sus implementaciones en memoria
//! útiles para pruebas. Encima expone el `VersionController` (numeración y
//! restauración de versiones) y el `WorkflowService` (orquestación).
//!
//! Diseño resumido:
//! - Append-only: cada versión es inmutable; restaurar añade otra versión.
//! - Locking optimista: cada escritura lleva un `expected_version` y el
//!   repositorio responde `PersistResult::Conflict` si no coincide.
//! - Sin reintentos: los conflictos suben al caller como
//!   `FlowError::Conflict`.
//! - Ejecuciones: se registran como `Execution` en estado RUNNING y se
//!   completan al consultar su estado en el motor remoto.
//!
//! Ejemplo rápido:
//! ```rust
//! use flow::stubs::{InMemoryAutomationClient, InMemoryWorkflowRepository};
//! use std::sync::Arc;
//! let repo = Arc::new(InMemoryWorkflowRepository::new());
//! let service = flow::WorkflowService::new(repo, Arc::new(InMemoryAutomationClient::default()));
//! ```
pub mod api;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod repository;
pub mod service;
pub mod stubs;

pub use api::*;
pub use domain::*;
pub use engine::*;
pub use errors::*;
pub use repository::*;
pub use service::*;
pub use stubs::*;
