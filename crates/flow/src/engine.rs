// Archivo: engine.rs
// Propósito: implementar `VersionController`, el motor del historial
// append-only de versiones por workflow.
//
// Nota: el controlador no reintenta nunca. Un `FlowError::Conflict` indica
// que otro escritor avanzó el contador; el caller relee y vuelve a invocar.
use crate::domain::{PersistResult, RestoreOutcome, WorkflowVersion};
use crate::errors::{FlowError, Result};
use crate::repository::WorkflowRepository;
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;
use workflow_graph::{validate, WorkflowDocument};

/// Change log por defecto de la versión 1.
pub const INITIAL_CHANGE_LOG: &str = "Initial version";

/// Controlador de versiones.
///
/// Responsabilidades principales:
/// - Numerar versiones 1, 2, 3... por workflow, sin huecos ni reutilización
/// - Delegar cada escritura en `WorkflowRepository::persist_version`, que la
///   ejecuta de forma atómica con control optimista
/// - Restaurar versiones antiguas añadiendo una versión nueva
pub struct VersionController<R>
    where R: WorkflowRepository
{
    repo: Arc<R>,
}

impl<R> VersionController<R> where R: WorkflowRepository
{
    /// Crea el controlador con el repositorio inyectado.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Crea la versión 1 de un workflow recién creado.
    ///
    /// Errores:
    /// - `NotFound` si el workflow no existe.
    /// - `Conflict` si ya tiene alguna versión.
    pub fn create_initial_version(&self,
                                  workflow_id: Uuid,
                                  document: WorkflowDocument,
                                  actor_id: &str)
                                  -> Result<WorkflowVersion> {
        self.create_initial_version_with_log(workflow_id, document, actor_id, INITIAL_CHANGE_LOG)
    }

    /// Igual que `create_initial_version` con un change log explícito.
    pub fn create_initial_version_with_log(&self,
                                           workflow_id: Uuid,
                                           document: WorkflowDocument,
                                           actor_id: &str,
                                           change_log: &str)
                                           -> Result<WorkflowVersion> {
        match self.repo.count_versions(&workflow_id)? {
            -1 => return Err(FlowError::NotFound(format!("workflow {}", workflow_id))),
            0 => {}
            n => {
                return Err(FlowError::Conflict(format!("workflow {} already has {} version(s)", workflow_id, n)));
            }
        }
        self.append_version(workflow_id, 0, document, actor_id, change_log)
    }

    /// Crea la versión `actual + 1` y mueve el puntero del workflow.
    ///
    /// `NotFound` si el workflow no existe o todavía no tiene versiones
    /// (usar `create_initial_version` primero).
    pub fn create_next_version(&self,
                               workflow_id: Uuid,
                               document: WorkflowDocument,
                               actor_id: &str,
                               change_log: &str)
                               -> Result<WorkflowVersion> {
        let meta = self.repo.get_workflow_meta(&workflow_id)?;
        if meta.current_version == 0 {
            return Err(FlowError::NotFound(format!("workflow {} has no versions", workflow_id)));
        }
        self.append_version(workflow_id, meta.current_version, document, actor_id, change_log)
    }

    /// Primitiva optimista: escribe la versión `expected_version + 1` sólo si
    /// el contador guardado sigue valiendo `expected_version`.
    ///
    /// Output:
    /// - `Ok(WorkflowVersion)` con la versión persistida.
    /// - `Err(FlowError::Conflict)` si otro escritor se adelantó.
    pub fn append_version(&self,
                          workflow_id: Uuid,
                          expected_version: i64,
                          document: WorkflowDocument,
                          actor_id: &str,
                          change_log: &str)
                          -> Result<WorkflowVersion> {
        let version = WorkflowVersion::new(workflow_id, expected_version + 1, document, change_log, actor_id)?;
        match self.repo.persist_version(&version, expected_version)? {
            PersistResult::Ok { new_version } => {
                debug!("workflow {} advanced to version {}", workflow_id, new_version);
                Ok(version)
            }
            PersistResult::Conflict => {
                warn!("version conflict on workflow {} (expected {})", workflow_id, expected_version);
                Err(FlowError::Conflict(format!("workflow {} is no longer at version {}",
                                                workflow_id, expected_version)))
            }
        }
    }

    /// Restaura `target_version` como versión nueva con change log
    /// "Restored from version N". El documento restaurado se revalida: si
    /// no es válido la restauración sigue adelante y el reporte se devuelve
    /// al caller.
    pub fn restore_version(&self, workflow_id: Uuid, target_version: i64, actor_id: &str) -> Result<RestoreOutcome> {
        let target = self.repo
                         .get_version(&workflow_id, target_version)?
                         .ok_or_else(|| {
                             FlowError::NotFound(format!("version {} of workflow {}", target_version, workflow_id))
                         })?;
        if !target.verify_integrity() {
            warn!("version {} of workflow {} does not match its stored hash", target_version, workflow_id);
        }
        let report = validate(&target.document);
        if !report.is_valid {
            warn!("restoring invalid version {} of workflow {}: {}",
                  target_version,
                  workflow_id,
                  report.error_summary());
        }
        let change_log = format!("Restored from version {}", target_version);
        let version = self.create_next_version(workflow_id, target.document, actor_id, &change_log)?;
        info!("workflow {} restored from version {} as version {}", workflow_id, target_version, version.version);
        Ok(RestoreOutcome { version, report })
    }

    /// Historial completo, de la versión más reciente a la más antigua.
    pub fn list_versions(&self, workflow_id: Uuid) -> Result<Vec<WorkflowVersion>> {
        if !self.repo.workflow_exists(&workflow_id)? {
            return Err(FlowError::NotFound(format!("workflow {}", workflow_id)));
        }
        let mut versions = self.repo.read_versions(&workflow_id)?;
        versions.reverse();
        Ok(versions)
    }

    /// Versión exacta; `NotFound` si no existe.
    pub fn get_version(&self, workflow_id: Uuid, version: i64) -> Result<WorkflowVersion> {
        self.repo
            .get_version(&workflow_id, version)?
            .ok_or_else(|| FlowError::NotFound(format!("version {} of workflow {}", version, workflow_id)))
    }
}
