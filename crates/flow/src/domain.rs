// Archivo: domain.rs
// Propósito: tipos de dominio persistidos por el repositorio: el registro
// del workflow (puntero mutable al documento actual) y las versiones
// inmutables que forman su historial.
use crate::errors::{FlowError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use workflow_graph::{ValidationReport, WorkflowDocument};

/// Estado de publicación del workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Deployed,
    Archived,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "DRAFT",
            WorkflowStatus::Deployed => "DEPLOYED",
            WorkflowStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(WorkflowStatus::Draft),
            "DEPLOYED" => Ok(WorkflowStatus::Deployed),
            "ARCHIVED" => Ok(WorkflowStatus::Archived),
            other => Err(FlowError::Validation(format!("estado de workflow desconocido: {}", other))),
        }
    }
}

/// Metadatos del workflow. `document` y `current_version` forman el
/// puntero "actual": es la única parte mutable del modelo.
///
/// `current_version` vale 0 hasta que se crea la versión inicial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMeta {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: WorkflowStatus,
    pub document: WorkflowDocument,
    pub current_version: i64,
    pub remote_id: Option<String>,
    pub is_deployed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registro inmutable de una versión. Se crea una única vez y nunca se
/// modifica; `document_hash` permite comprobarlo al releerlo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowVersion {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub version: i64,
    pub document: WorkflowDocument,
    pub document_hash: String,
    pub change_log: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl WorkflowVersion {
    /// Construye una versión nueva calculando el digest del documento.
    pub fn new(workflow_id: Uuid,
               version: i64,
               document: WorkflowDocument,
               change_log: impl Into<String>,
               created_by: impl Into<String>)
               -> Result<Self> {
        let document_hash = document_hash(&document)?;
        Ok(Self { id: Uuid::new_v4(),
                  workflow_id,
                  version,
                  document,
                  document_hash,
                  change_log: change_log.into(),
                  created_by: created_by.into(),
                  created_at: Utc::now() })
    }

    /// true si el documento sigue coincidiendo con el digest guardado.
    pub fn verify_integrity(&self) -> bool {
        document_hash(&self.document).map(|h| h == self.document_hash).unwrap_or(false)
    }
}

/// Digest blake3 (hex) de la serialización canónica del documento.
pub fn document_hash(document: &WorkflowDocument) -> Result<String> {
    let canonical = document.to_canonical_string()?;
    Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
}

/// Resultado de una escritura con control optimista.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistResult {
    Ok { new_version: i64 },
    Conflict,
}

/// Resultado de restaurar una versión: la versión nueva y el reporte de
/// revalidación del documento restaurado (puede ser inválido).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    pub version: WorkflowVersion,
    pub report: ValidationReport,
}

/// Identificador y URL de un workflow en el motor de automatización.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteWorkflow {
    pub id: String,
    pub url: String,
}

/// Filtros y paginación para listar workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub status: Option<WorkflowStatus>,
    /// Página 1-based.
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self { status: None, page: 1, page_size: 20 }
    }
}

impl ListOptions {
    /// Desplazamiento (filas a saltar) para la página pedida.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }
}

/// Página de resultados.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, options: &ListOptions) -> Self {
        let page = options.page.max(1);
        let has_more = u64::from(page) * u64::from(options.page_size) < total;
        Self { items, total, page, page_size: options.page_size, has_more }
    }
}

/// Datos para crear un workflow desde capas superiores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkflow {
    pub name: String,
    pub description: Option<String>,
    pub document: WorkflowDocument,
    /// Change log de la versión 1; por defecto "Initial version".
    pub change_log: Option<String>,
}

/// Opciones de despliegue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeployOptions {
    pub activate: bool,
}

/// Resultado de desplegar un workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub workflow_id: Uuid,
    pub remote_id: String,
    /// Vacía cuando se actualiza un workflow ya desplegado.
    pub deployed_url: String,
    pub status: WorkflowStatus,
}

/// Estado de una ejecución en el motor de automatización.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Success,
    Error,
    Waiting,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Error => "ERROR",
            ExecutionStatus::Waiting => "WAITING",
        }
    }

    /// true mientras el motor no haya terminado la ejecución.
    pub fn is_running(&self) -> bool {
        matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RUNNING" => Ok(ExecutionStatus::Running),
            "SUCCESS" => Ok(ExecutionStatus::Success),
            "ERROR" => Ok(ExecutionStatus::Error),
            "WAITING" => Ok(ExecutionStatus::Waiting),
            other => Err(FlowError::Validation(format!("estado de ejecución desconocido: {}", other))),
        }
    }
}

/// Registro local de una ejecución lanzada en el motor.
///
/// Se crea en `Running`; al consultar su estado se refresca desde el motor y,
/// cuando termina, se guardan la salida, el error y `completed_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub owner_id: String,
    pub status: ExecutionStatus,
    pub remote_execution_id: String,
    pub input_data: serde_json::Value,
    pub output_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Execution {
    pub fn started(workflow_id: Uuid,
                   owner_id: impl Into<String>,
                   remote_execution_id: impl Into<String>,
                   input_data: serde_json::Value)
                   -> Self {
        Self { id: Uuid::new_v4(),
               workflow_id,
               owner_id: owner_id.into(),
               status: ExecutionStatus::Running,
               remote_execution_id: remote_execution_id.into(),
               input_data,
               output_data: None,
               error_message: None,
               started_at: Utc::now(),
               completed_at: None }
    }

    /// Aplica el estado devuelto por el motor. Devuelve true si cambió.
    pub fn apply_remote(&mut self, remote: RemoteExecution) -> bool {
        if remote.status.is_running() {
            return false;
        }
        self.status = remote.status;
        self.output_data = remote.data;
        self.error_message = remote.error;
        self.completed_at = Some(Utc::now());
        true
    }
}

/// Estado de una ejecución tal y como lo informa el motor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteExecution {
    pub status: ExecutionStatus,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}
