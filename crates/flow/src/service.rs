// Archivo: service.rs
// Propósito: implementar `WorkflowService`, la capa orquestadora que expone
// operaciones de alto nivel sobre workflows (crear, listar, actualizar,
// validar, desplegar, ejecutar, restaurar). Esta capa debe ser invocada desde
// handlers HTTP o desde la CLI.
use crate::domain::{DeployOptions, Deployment, Execution, ListOptions, NewWorkflow, Page, RestoreOutcome,
                    WorkflowMeta, WorkflowStatus, WorkflowVersion};
use crate::engine::{VersionController, INITIAL_CHANGE_LOG};
use crate::errors::{FlowError, Result};
use crate::repository::{AutomationClient, WorkflowRepository};
use log::{error, info, warn};
use std::sync::Arc;
use uuid::Uuid;
use workflow_graph::{validate, DocumentPatch, ValidationReport};

/// Servicio de alto nivel sobre workflows.
///
/// Orquesta el repositorio, el `VersionController` y el motor de
/// automatización. Todas las operaciones comprueban que el workflow
/// pertenece a `owner_id`; si no, responden `NotFound` igual que si no
/// existiera.
pub struct WorkflowService<R, A>
    where R: WorkflowRepository,
          A: AutomationClient
{
    repo: Arc<R>,
    versions: Arc<VersionController<R>>,
    automation: Arc<A>,
}

impl<R, A> WorkflowService<R, A>
    where R: WorkflowRepository + 'static,
          A: AutomationClient + 'static
{
    /// Crea el servicio inyectando repositorio y cliente de automatización.
    /// El `VersionController` se construye internamente y se reusa.
    pub fn new(repo: Arc<R>, automation: Arc<A>) -> Self {
        let versions = Arc::new(VersionController::new(repo.clone()));
        Self { repo, versions, automation }
    }

    /// Acceso al controlador de versiones compartido.
    pub fn versions(&self) -> &VersionController<R> {
        &self.versions
    }

    /// Crea el workflow en `Draft` y su versión 1.
    ///
    /// Si la versión 1 no se puede escribir se borra el registro recién
    /// creado, de modo que no quedan workflows sin historial.
    pub fn create_workflow(&self, owner_id: &str, request: NewWorkflow) -> Result<WorkflowMeta> {
        info!("creating workflow '{}' for {}", request.name, owner_id);
        let workflow_id = self.repo
                              .create_workflow(owner_id, &request.name, request.description.clone(), &request.document)?;
        let change_log = request.change_log.as_deref().unwrap_or(INITIAL_CHANGE_LOG);
        let initial = self.versions.create_initial_version_with_log(workflow_id, request.document, owner_id, change_log);
        if let Err(e) = initial {
            error!("initial version of workflow {} failed: {}", workflow_id, e);
            if let Err(cleanup) = self.repo.delete_workflow(&workflow_id) {
                warn!("could not remove workflow {} without versions: {}", workflow_id, cleanup);
            }
            return Err(e);
        }
        info!("workflow {} created", workflow_id);
        self.repo.get_workflow_meta(&workflow_id)
    }

    /// Obtiene el workflow si existe y pertenece a `owner_id`.
    pub fn get_workflow(&self, workflow_id: Uuid, owner_id: &str) -> Result<WorkflowMeta> {
        match self.repo.get_workflow_meta(&workflow_id) {
            Ok(meta) if meta.owner_id == owner_id => Ok(meta),
            Ok(_) | Err(FlowError::NotFound(_)) => {
                Err(FlowError::NotFound("Workflow not found or access denied".to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Lista paginada de los workflows del propietario.
    pub fn list_workflows(&self, owner_id: &str, options: &ListOptions) -> Result<Page<WorkflowMeta>> {
        self.repo.list_workflows(owner_id, options)
    }

    /// Aplica un merge superficial sobre el documento actual y crea la
    /// versión siguiente ("Workflow updated").
    pub fn update_workflow(&self, workflow_id: Uuid, owner_id: &str, patch: &DocumentPatch) -> Result<WorkflowMeta> {
        let meta = self.get_workflow(workflow_id, owner_id)?;
        let merged = meta.document.apply_patch(patch);
        let version =
            self.versions.append_version(workflow_id, meta.current_version, merged, owner_id, "Workflow updated")?;
        info!("workflow {} updated to version {}", workflow_id, version.version);
        self.repo.get_workflow_meta(&workflow_id)
    }

    /// Elimina el workflow y su historial. Si estaba desplegado intenta
    /// borrarlo también del motor; un fallo remoto sólo se registra.
    pub fn delete_workflow(&self, workflow_id: Uuid, owner_id: &str) -> Result<()> {
        let meta = self.get_workflow(workflow_id, owner_id)?;
        if let Some(remote_id) = &meta.remote_id {
            if let Err(e) = self.automation.delete(remote_id) {
                warn!("failed to delete remote workflow {}: {}", remote_id, e);
            }
        }
        self.repo.delete_workflow(&workflow_id)?;
        info!("workflow {} deleted", workflow_id);
        Ok(())
    }

    /// Valida el documento actual. La validación es una consulta: un
    /// documento inválido no es un error.
    pub fn validate_workflow(&self, workflow_id: Uuid, owner_id: &str) -> Result<ValidationReport> {
        let meta = self.get_workflow(workflow_id, owner_id)?;
        Ok(validate(&meta.document))
    }

    /// Despliega el documento actual en el motor de automatización.
    ///
    /// Un documento inválido devuelve `FlowError::Validation` con los
    /// errores concatenados. Si ya estaba desplegado se actualiza el remoto.
    pub fn deploy_workflow(&self, workflow_id: Uuid, owner_id: &str, options: DeployOptions) -> Result<Deployment> {
        let meta = self.get_workflow(workflow_id, owner_id)?;
        let report = validate(&meta.document);
        if !report.is_valid {
            error!("deploy of workflow {} rejected: {}", workflow_id, report.error_summary());
            return Err(FlowError::Validation(format!("Workflow validation failed: {}", report.error_summary())));
        }

        let (remote_id, deployed_url) = match &meta.remote_id {
            Some(remote_id) => {
                self.automation.update(remote_id, &meta.document)?;
                (remote_id.clone(), String::new())
            }
            None => {
                let remote = self.automation.deploy(&meta.document)?;
                (remote.id, remote.url)
            }
        };
        if options.activate {
            self.automation.activate(&remote_id)?;
        }
        self.repo.mark_deployed(&workflow_id, &remote_id)?;
        info!("workflow {} deployed as {}", workflow_id, remote_id);
        Ok(Deployment { workflow_id, remote_id, deployed_url, status: WorkflowStatus::Deployed })
    }

    /// Desactiva el workflow en el motor. `Validation` si nunca se desplegó.
    pub fn deactivate_workflow(&self, workflow_id: Uuid, owner_id: &str) -> Result<()> {
        let meta = self.get_workflow(workflow_id, owner_id)?;
        let remote_id = meta.remote_id.ok_or_else(|| FlowError::Validation("Workflow not deployed to n8n".into()))?;
        self.automation.deactivate(&remote_id)?;
        info!("workflow {} deactivated ({})", workflow_id, remote_id);
        Ok(())
    }

    /// Lanza una ejecución manual del workflow desplegado y guarda su
    /// registro en `Running`.
    pub fn execute_workflow(&self,
                            workflow_id: Uuid,
                            owner_id: &str,
                            input_data: serde_json::Value)
                            -> Result<Execution> {
        let meta = self.get_workflow(workflow_id, owner_id)?;
        let remote_id = meta.remote_id.ok_or_else(|| FlowError::Validation("Workflow not deployed to n8n".into()))?;
        let remote_execution_id = self.automation.execute(&remote_id, &input_data)?;
        let execution = Execution::started(workflow_id, owner_id, remote_execution_id, input_data);
        self.repo.create_execution(&execution)?;
        info!("workflow {} execution started ({})", workflow_id, execution.remote_execution_id);
        Ok(execution)
    }

    /// Estado de una ejecución. Si sigue en `Running` se consulta al motor y,
    /// cuando ya terminó, se guarda el resultado.
    pub fn execution_status(&self, execution_id: Uuid, owner_id: &str) -> Result<Execution> {
        let mut execution = match self.repo.get_execution(&execution_id)? {
            Some(e) if e.owner_id == owner_id => e,
            _ => return Err(FlowError::NotFound("Execution not found".to_string())),
        };
        if execution.status.is_running() {
            let remote = self.automation.execution_status(&execution.remote_execution_id)?;
            if execution.apply_remote(remote) {
                self.repo.update_execution(&execution)?;
                info!("execution {} finished with {}", execution_id, execution.status);
            }
        }
        Ok(execution)
    }

    /// Archiva el workflow (deja de listarse como borrador o desplegado).
    pub fn archive_workflow(&self, workflow_id: Uuid, owner_id: &str) -> Result<WorkflowMeta> {
        self.get_workflow(workflow_id, owner_id)?;
        self.repo.set_status(&workflow_id, WorkflowStatus::Archived)
    }

    /// Historial de versiones, la más reciente primero.
    pub fn version_history(&self, workflow_id: Uuid, owner_id: &str) -> Result<Vec<WorkflowVersion>> {
        self.get_workflow(workflow_id, owner_id)?;
        self.versions.list_versions(workflow_id)
    }

    /// Restaura una versión tras comprobar la propiedad del workflow.
    pub fn restore_version(&self, workflow_id: Uuid, owner_id: &str, version: i64) -> Result<RestoreOutcome> {
        self.get_workflow(workflow_id, owner_id)?;
        self.versions.restore_version(workflow_id, version, owner_id)
    }
}
