// Archivo: repository.rs
// Propósito: definir el trait `WorkflowRepository` y el colaborador externo
// `AutomationClient`. Describe el contrato que deben implementar las
// persistencias (Postgres, SQLite, in-memory) y los clientes del motor de
// automatización.
use crate::domain::{Execution, ListOptions, Page, PersistResult, RemoteExecution, RemoteWorkflow, WorkflowMeta,
                    WorkflowStatus, WorkflowVersion};
use crate::errors::Result;
use uuid::Uuid;
use workflow_graph::WorkflowDocument;

/// Contrato del almacén de workflows y de su historial de versiones.
///
/// Las versiones son append-only: el repositorio nunca modifica ni borra una
/// fila de versión salvo al borrar el workflow completo (cascada).
pub trait WorkflowRepository: Send + Sync {
    /// Obtiene el registro del workflow. `NotFound` si no existe.
    fn get_workflow_meta(&self, workflow_id: &Uuid) -> Result<WorkflowMeta>;

    /// Crea el registro del workflow en estado `Draft` con
    /// `current_version = 0`. El repositorio genera el id y las fechas.
    fn create_workflow(&self,
                       owner_id: &str,
                       name: &str,
                       description: Option<String>,
                       document: &WorkflowDocument)
                       -> Result<Uuid>;

    /// Lista los workflows de `owner_id` ordenados por `updated_at`
    /// descendente, filtrando por estado y paginando.
    fn list_workflows(&self, owner_id: &str, options: &ListOptions) -> Result<Page<WorkflowMeta>>;

    /// Persiste una versión en una única transacción:
    /// lee el contador, lo compara con `expected_version`, inserta la fila
    /// y actualiza el documento actual y el contador del workflow.
    ///
    /// Devuelve `PersistResult::Conflict` si el contador ya no coincide y
    /// `FlowError::Conflict` si `version.version != expected_version + 1`.
    fn persist_version(&self, version: &WorkflowVersion, expected_version: i64) -> Result<PersistResult>;

    /// Versiones del workflow en orden ascendente de número.
    fn read_versions(&self, workflow_id: &Uuid) -> Result<Vec<WorkflowVersion>>;

    /// Versión exacta `(workflow_id, version)`, si existe.
    fn get_version(&self, workflow_id: &Uuid, version: i64) -> Result<Option<WorkflowVersion>>;

    /// Cuenta las versiones del workflow. Devuelve -1 si el workflow no
    /// existe, 0 si existe pero no tiene versiones.
    fn count_versions(&self, workflow_id: &Uuid) -> Result<i64>;

    /// Verifica si existe un workflow con el id dado.
    fn workflow_exists(&self, workflow_id: &Uuid) -> Result<bool>;

    /// Actualiza el estado del workflow y devuelve el registro nuevo.
    fn set_status(&self, workflow_id: &Uuid, status: WorkflowStatus) -> Result<WorkflowMeta>;

    /// Marca el workflow como desplegado con el id remoto dado.
    fn mark_deployed(&self, workflow_id: &Uuid, remote_id: &str) -> Result<WorkflowMeta>;

    /// Elimina el workflow, sus versiones y sus ejecuciones.
    fn delete_workflow(&self, workflow_id: &Uuid) -> Result<()>;

    /// Guarda una ejecución nueva. `NotFound` si el workflow no existe.
    fn create_execution(&self, execution: &Execution) -> Result<()>;

    /// Ejecución por id, si existe.
    fn get_execution(&self, execution_id: &Uuid) -> Result<Option<Execution>>;

    /// Reemplaza el estado, la salida y el cierre de una ejecución.
    /// `NotFound` si no existe.
    fn update_execution(&self, execution: &Execution) -> Result<()>;
}

/// Cliente del motor de automatización (n8n). Sólo recibe documentos ya
/// validados; la implementación HTTP vive fuera de este crate.
pub trait AutomationClient: Send + Sync {
    /// Crea el workflow en el motor y devuelve su id y URL.
    fn deploy(&self, document: &WorkflowDocument) -> Result<RemoteWorkflow>;
    /// Reemplaza el documento de un workflow ya desplegado.
    fn update(&self, remote_id: &str, document: &WorkflowDocument) -> Result<()>;
    /// Activa el workflow remoto.
    fn activate(&self, remote_id: &str) -> Result<()>;
    /// Desactiva el workflow remoto.
    fn deactivate(&self, remote_id: &str) -> Result<()>;
    /// Elimina el workflow remoto.
    fn delete(&self, remote_id: &str) -> Result<()>;
    /// Lanza una ejecución manual y devuelve el id de ejecución del motor.
    fn execute(&self, remote_id: &str, input_data: &serde_json::Value) -> Result<String>;
    /// Estado actual de una ejecución remota.
    fn execution_status(&self, execution_id: &str) -> Result<RemoteExecution>;
}
