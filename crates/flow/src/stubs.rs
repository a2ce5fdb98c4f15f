// Archivo: stubs.rs
// Propósito: implementaciones en memoria para pruebas y wiring rápido.
//
// Incluye un repositorio en memoria (`InMemoryWorkflowRepository`) y un
// cliente de automatización simulado (`InMemoryAutomationClient`). Estas
// implementaciones no son durables y se usan para demos o pruebas locales.
use crate::domain::{Execution, ExecutionStatus, ListOptions, Page, PersistResult, RemoteExecution, RemoteWorkflow,
                    WorkflowMeta, WorkflowStatus, WorkflowVersion};
use crate::errors::{FlowError, Result};
use crate::repository::{AutomationClient, WorkflowRepository};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;
use workflow_graph::WorkflowDocument;

/// Repositorio en memoria (no durable).
///
/// Orden de bloqueo: `workflows`, luego `versions`, luego `executions`; así
/// `persist_version` ejecuta lectura-comparación-escritura como una única
/// sección crítica.
pub struct InMemoryWorkflowRepository {
    /// Registros de workflow indexados por id.
    workflows: Mutex<HashMap<Uuid, WorkflowMeta>>,
    /// Historial de versiones por workflow, en orden de creación.
    versions: Mutex<HashMap<Uuid, Vec<WorkflowVersion>>>,
    /// Ejecuciones indexadas por id.
    executions: Mutex<HashMap<Uuid, Execution>>,
}

impl InMemoryWorkflowRepository {
    /// Crea una nueva instancia del repositorio en memoria.
    pub fn new() -> Self {
        Self { workflows: Mutex::new(HashMap::new()),
               versions: Mutex::new(HashMap::new()),
               executions: Mutex::new(HashMap::new()) }
    }

    /// Helper para mapear `Mutex::lock()` en un `Result` con
    /// `FlowError::Storage`.
    fn lock<'a, T>(&'a self, m: &'a Mutex<T>) -> std::result::Result<MutexGuard<'a, T>, FlowError> {
        m.lock().map_err(|e| FlowError::Storage(format!("mutex poisoned: {:?}", e)))
    }

    fn not_found(workflow_id: &Uuid) -> FlowError {
        FlowError::NotFound(format!("workflow {}", workflow_id))
    }
}

impl Default for InMemoryWorkflowRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowRepository for InMemoryWorkflowRepository {
    fn get_workflow_meta(&self, workflow_id: &Uuid) -> Result<WorkflowMeta> {
        let workflows = self.lock(&self.workflows)?;
        workflows.get(workflow_id).cloned().ok_or_else(|| Self::not_found(workflow_id))
    }

    fn create_workflow(&self,
                       owner_id: &str,
                       name: &str,
                       description: Option<String>,
                       document: &WorkflowDocument)
                       -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let meta = WorkflowMeta { id,
                                  owner_id: owner_id.to_string(),
                                  name: name.to_string(),
                                  description,
                                  status: WorkflowStatus::Draft,
                                  document: document.clone(),
                                  current_version: 0,
                                  remote_id: None,
                                  is_deployed: false,
                                  created_at: now,
                                  updated_at: now };
        self.lock(&self.workflows)?.insert(id, meta);
        Ok(id)
    }

    fn list_workflows(&self, owner_id: &str, options: &ListOptions) -> Result<Page<WorkflowMeta>> {
        let workflows = self.lock(&self.workflows)?;
        let mut matching: Vec<WorkflowMeta> = workflows.values()
                                                       .filter(|w| w.owner_id == owner_id)
                                                       .filter(|w| options.status.is_none_or(|s| w.status == s))
                                                       .cloned()
                                                       .collect();
        // id as tie-breaker keeps pages stable when timestamps collide
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        let total = matching.len() as u64;
        let items = matching.into_iter()
                            .skip(options.offset() as usize)
                            .take(options.page_size as usize)
                            .collect();
        Ok(Page::new(items, total, options))
    }

    /// Persiste una versión aplicando control optimista por
    /// `expected_version`.
    fn persist_version(&self, version: &WorkflowVersion, expected_version: i64) -> Result<PersistResult> {
        let mut workflows = self.lock(&self.workflows)?;
        let mut versions = self.lock(&self.versions)?;
        let meta = workflows.get_mut(&version.workflow_id).ok_or_else(|| Self::not_found(&version.workflow_id))?;
        // Optimistic concurrency: check expected_version
        if meta.current_version != expected_version {
            return Ok(PersistResult::Conflict);
        }
        if version.version != expected_version + 1 {
            return Err(FlowError::Conflict(format!("version {} does not follow current {}",
                                                   version.version, expected_version)));
        }
        let history = versions.entry(version.workflow_id).or_default();
        if history.iter().any(|v| v.version == version.version) {
            return Err(FlowError::Conflict(format!("version {} already exists", version.version)));
        }
        history.push(version.clone());
        meta.document = version.document.clone();
        meta.current_version = version.version;
        meta.updated_at = Utc::now();
        Ok(PersistResult::Ok { new_version: meta.current_version })
    }

    fn read_versions(&self, workflow_id: &Uuid) -> Result<Vec<WorkflowVersion>> {
        let versions = self.lock(&self.versions)?;
        let mut list = versions.get(workflow_id).cloned().unwrap_or_default();
        list.sort_by_key(|v| v.version);
        Ok(list)
    }

    fn get_version(&self, workflow_id: &Uuid, version: i64) -> Result<Option<WorkflowVersion>> {
        let versions = self.lock(&self.versions)?;
        Ok(versions.get(workflow_id).and_then(|list| list.iter().find(|v| v.version == version)).cloned())
    }

    fn count_versions(&self, workflow_id: &Uuid) -> Result<i64> {
        let workflows = self.lock(&self.workflows)?;
        if !workflows.contains_key(workflow_id) {
            return Ok(-1);
        }
        let versions = self.lock(&self.versions)?;
        Ok(versions.get(workflow_id).map(|v| v.len() as i64).unwrap_or(0))
    }

    fn workflow_exists(&self, workflow_id: &Uuid) -> Result<bool> {
        Ok(self.lock(&self.workflows)?.contains_key(workflow_id))
    }

    fn set_status(&self, workflow_id: &Uuid, status: WorkflowStatus) -> Result<WorkflowMeta> {
        let mut workflows = self.lock(&self.workflows)?;
        let meta = workflows.get_mut(workflow_id).ok_or_else(|| Self::not_found(workflow_id))?;
        meta.status = status;
        meta.updated_at = Utc::now();
        Ok(meta.clone())
    }

    fn mark_deployed(&self, workflow_id: &Uuid, remote_id: &str) -> Result<WorkflowMeta> {
        let mut workflows = self.lock(&self.workflows)?;
        let meta = workflows.get_mut(workflow_id).ok_or_else(|| Self::not_found(workflow_id))?;
        meta.remote_id = Some(remote_id.to_string());
        meta.status = WorkflowStatus::Deployed;
        meta.is_deployed = true;
        meta.updated_at = Utc::now();
        Ok(meta.clone())
    }

    fn delete_workflow(&self, workflow_id: &Uuid) -> Result<()> {
        let mut workflows = self.lock(&self.workflows)?;
        let mut versions = self.lock(&self.versions)?;
        let mut executions = self.lock(&self.executions)?;
        if workflows.remove(workflow_id).is_none() {
            return Err(Self::not_found(workflow_id));
        }
        versions.remove(workflow_id);
        executions.retain(|_, e| e.workflow_id != *workflow_id);
        Ok(())
    }

    fn create_execution(&self, execution: &Execution) -> Result<()> {
        let workflows = self.lock(&self.workflows)?;
        if !workflows.contains_key(&execution.workflow_id) {
            return Err(Self::not_found(&execution.workflow_id));
        }
        self.lock(&self.executions)?.insert(execution.id, execution.clone());
        Ok(())
    }

    fn get_execution(&self, execution_id: &Uuid) -> Result<Option<Execution>> {
        Ok(self.lock(&self.executions)?.get(execution_id).cloned())
    }

    fn update_execution(&self, execution: &Execution) -> Result<()> {
        let mut executions = self.lock(&self.executions)?;
        let stored = executions.get_mut(&execution.id)
                               .ok_or_else(|| FlowError::NotFound(format!("execution {}", execution.id)))?;
        *stored = execution.clone();
        Ok(())
    }
}

/// Estado de un workflow dentro del motor simulado.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteState {
    pub document: WorkflowDocument,
    pub active: bool,
}

/// Motor de automatización simulado: guarda los documentos en memoria y
/// genera ids secuenciales. `failing()` construye uno que rechaza todo, útil
/// para probar la tolerancia a fallos del servicio.
pub struct InMemoryAutomationClient {
    base_url: String,
    fail: bool,
    next_id: Mutex<u64>,
    workflows: Mutex<HashMap<String, RemoteState>>,
    executions: Mutex<HashMap<String, RemoteExecution>>,
}

impl InMemoryAutomationClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(),
               fail: false,
               next_id: Mutex::new(1),
               workflows: Mutex::new(HashMap::new()),
               executions: Mutex::new(HashMap::new()) }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new("http://localhost:5678") }
    }

    /// Copia del estado remoto de un workflow, si existe.
    pub fn remote(&self, remote_id: &str) -> Option<RemoteState> {
        self.workflows.lock().unwrap_or_else(|e| e.into_inner()).get(remote_id).cloned()
    }

    /// Cierra una ejecución simulada con el estado dado.
    pub fn finish_execution(&self, execution_id: &str, outcome: RemoteExecution) -> Result<()> {
        let mut executions = self.lock_executions()?;
        let slot = executions.get_mut(execution_id)
                             .ok_or_else(|| FlowError::External(format!("execution {} not found", execution_id)))?;
        *slot = outcome;
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            return Err(FlowError::External("automation engine unavailable".into()));
        }
        Ok(())
    }

    fn lock_executions(&self) -> Result<MutexGuard<'_, HashMap<String, RemoteExecution>>> {
        self.executions.lock().map_err(|e| FlowError::Storage(format!("mutex poisoned: {:?}", e)))
    }

    fn next_id(&self) -> Result<u64> {
        let mut next = self.next_id.lock().map_err(|e| FlowError::Storage(format!("mutex poisoned: {:?}", e)))?;
        let id = *next;
        *next += 1;
        Ok(id)
    }

    fn set_active(&self, remote_id: &str, active: bool) -> Result<()> {
        self.check()?;
        let mut workflows = self.lock_workflows()?;
        let state = workflows.get_mut(remote_id)
                             .ok_or_else(|| FlowError::External(format!("remote workflow {} not found", remote_id)))?;
        state.active = active;
        Ok(())
    }

    fn lock_workflows(&self) -> Result<MutexGuard<'_, HashMap<String, RemoteState>>> {
        self.workflows.lock().map_err(|e| FlowError::Storage(format!("mutex poisoned: {:?}", e)))
    }
}

impl Default for InMemoryAutomationClient {
    fn default() -> Self {
        Self::new("http://localhost:5678")
    }
}

impl AutomationClient for InMemoryAutomationClient {
    fn deploy(&self, document: &WorkflowDocument) -> Result<RemoteWorkflow> {
        self.check()?;
        let id = self.next_id()?.to_string();
        self.lock_workflows()?.insert(id.clone(), RemoteState { document: document.clone(), active: false });
        Ok(RemoteWorkflow { url: format!("{}/workflow/{}", self.base_url, id), id })
    }

    fn update(&self, remote_id: &str, document: &WorkflowDocument) -> Result<()> {
        self.check()?;
        let mut workflows = self.lock_workflows()?;
        let state = workflows.get_mut(remote_id)
                             .ok_or_else(|| FlowError::External(format!("remote workflow {} not found", remote_id)))?;
        state.document = document.clone();
        Ok(())
    }

    fn activate(&self, remote_id: &str) -> Result<()> {
        self.set_active(remote_id, true)
    }

    fn deactivate(&self, remote_id: &str) -> Result<()> {
        self.set_active(remote_id, false)
    }

    fn delete(&self, remote_id: &str) -> Result<()> {
        self.check()?;
        self.lock_workflows()?
            .remove(remote_id)
            .map(|_| ())
            .ok_or_else(|| FlowError::External(format!("remote workflow {} not found", remote_id)))
    }

    // Las ejecuciones quedan en `Running` hasta `finish_execution`.
    fn execute(&self, remote_id: &str, _input_data: &serde_json::Value) -> Result<String> {
        self.check()?;
        if !self.lock_workflows()?.contains_key(remote_id) {
            return Err(FlowError::External(format!("remote workflow {} not found", remote_id)));
        }
        let execution_id = format!("exec-{}", self.next_id()?);
        self.lock_executions()?
            .insert(execution_id.clone(), RemoteExecution { status: ExecutionStatus::Running, data: None, error: None });
        Ok(execution_id)
    }

    fn execution_status(&self, execution_id: &str) -> Result<RemoteExecution> {
        self.check()?;
        self.lock_executions()?
            .get(execution_id)
            .cloned()
            .ok_or_else(|| FlowError::External(format!("execution {} not found", execution_id)))
    }
}
