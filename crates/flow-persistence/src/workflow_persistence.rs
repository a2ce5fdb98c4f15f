//! Repositorio Diesel que implementa `WorkflowRepository`.
//!
//! El historial se guarda en `workflow_versions` con índice único
//! `(workflow_id, version)`; el puntero actual vive en `workflows`. Cada
//! `persist_version` es una transacción: UPDATE condicionado por
//! `current_version = expected` seguido del INSERT de la versión.
use crate::config::FlowDbConfig;
use crate::schema;
use crate::schema::executions::dsl as e_dsl;
use crate::schema::workflow_versions::dsl as v_dsl;
use crate::schema::workflows::dsl as w_dsl;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use flow::domain::{Execution, ExecutionStatus, ListOptions, Page, PersistResult, WorkflowMeta, WorkflowStatus,
                   WorkflowVersion};
use flow::errors::{FlowError, Result};
use flow::repository::WorkflowRepository;
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;
use workflow_graph::WorkflowDocument;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
#[cfg(feature = "pg")]
type DbConn = PgConnection;
#[cfg(not(feature = "pg"))]
type DbConn = SqliteConnection;
type DbPool = Pool<ConnectionManager<DbConn>>;

/// PRAGMAs por conexión: cada conexión del pool las necesita, no sólo la
/// primera.
#[cfg(not(feature = "pg"))]
#[derive(Debug)]
struct SqlitePragmas;

#[cfg(not(feature = "pg"))]
impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
    // journal_mode y busy_timeout devuelven una fila; el resultado se ignora
    let _ = diesel::sql_query("PRAGMA journal_mode = WAL;").execute(conn);
    let _ = diesel::sql_query("PRAGMA busy_timeout = 5000;").execute(conn);
    diesel::sql_query("PRAGMA foreign_keys = ON;").execute(conn).map_err(diesel::r2d2::Error::QueryError)?;
    Ok(())
  }
}

/// Repo Diesel que implementa `WorkflowRepository`.
pub struct DieselWorkflowRepository {
  pool: Arc<DbPool>,
}

impl DieselWorkflowRepository {
  /// Crea el pool y aplica las migraciones pendientes.
  pub fn new(config: &FlowDbConfig) -> Result<Self> {
    let manager = ConnectionManager::<DbConn>::new(config.database_url.as_str());
    let builder = Pool::<ConnectionManager<DbConn>>::builder().max_size(config.pool_size);
    #[cfg(not(feature = "pg"))]
    let builder = builder.connection_customizer(Box::new(SqlitePragmas));
    let pool = builder.build(manager).map_err(|e| FlowError::Storage(format!("pool: {}", e)))?;
    let repo = DieselWorkflowRepository { pool: Arc::new(pool) };
    repo.run_migrations()?;
    Ok(repo)
  }

  fn run_migrations(&self) -> Result<()> {
    let mut conn = self.conn()?;
    let applied =
      conn.run_pending_migrations(MIGRATIONS).map_err(|e| FlowError::Storage(format!("migrations: {}", e)))?;
    if !applied.is_empty() {
      info!("applied {} migration(s)", applied.len());
    }
    Ok(())
  }

  fn conn(&self) -> Result<PooledConnection<ConnectionManager<DbConn>>> {
    self.pool.get().map_err(|e| FlowError::Storage(format!("pool: {}", e)))
  }
}

// Filas Diesel; el orden de campos sigue al de `schema.rs`.
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::workflows)]
struct WorkflowRow {
  pub id: String,
  pub owner_id: String,
  pub name: String,
  pub description: Option<String>,
  pub status: String,
  pub document: String,
  pub current_version: i64,
  pub remote_id: Option<String>,
  pub is_deployed: bool,
  pub created_at_ts: i64,
  pub updated_at_ts: i64,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::workflow_versions)]
struct VersionRow {
  pub id: String,
  pub workflow_id: String,
  pub version: i64,
  pub document: String,
  pub document_hash: String,
  pub change_log: String,
  pub created_by: String,
  pub created_at_ts: i64,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::executions)]
struct ExecutionRow {
  pub id: String,
  pub workflow_id: String,
  pub owner_id: String,
  pub status: String,
  pub remote_execution_id: String,
  pub input_data: String,
  pub output_data: Option<String>,
  pub error_message: Option<String>,
  pub started_at_ts: i64,
  pub completed_at_ts: Option<i64>,
}

impl ExecutionRow {
  fn from_execution(execution: &Execution) -> Result<Self> {
    Ok(ExecutionRow { id: execution.id.to_string(),
                      workflow_id: execution.workflow_id.to_string(),
                      owner_id: execution.owner_id.clone(),
                      status: execution.status.as_str().to_string(),
                      remote_execution_id: execution.remote_execution_id.clone(),
                      input_data: serde_json::to_string(&execution.input_data)?,
                      output_data: execution.output_data.as_ref().map(serde_json::to_string).transpose()?,
                      error_message: execution.error_message.clone(),
                      started_at_ts: execution.started_at.timestamp_micros(),
                      completed_at_ts: execution.completed_at.map(|t| t.timestamp_micros()) })
  }

  fn into_execution(self) -> Result<Execution> {
    Ok(Execution { id: parse_uuid(&self.id)?,
                   workflow_id: parse_uuid(&self.workflow_id)?,
                   owner_id: self.owner_id,
                   status: self.status.parse::<ExecutionStatus>()?,
                   remote_execution_id: self.remote_execution_id,
                   input_data: serde_json::from_str(&self.input_data)?,
                   output_data: self.output_data.as_deref().map(serde_json::from_str).transpose()?,
                   error_message: self.error_message,
                   started_at: from_micros(self.started_at_ts)?,
                   completed_at: self.completed_at_ts.map(from_micros).transpose()? })
  }
}

impl WorkflowRow {
  fn into_meta(self) -> Result<WorkflowMeta> {
    Ok(WorkflowMeta { id: parse_uuid(&self.id)?,
                      owner_id: self.owner_id,
                      name: self.name,
                      description: self.description,
                      status: self.status.parse::<WorkflowStatus>()?,
                      document: serde_json::from_str::<WorkflowDocument>(&self.document)?,
                      current_version: self.current_version,
                      remote_id: self.remote_id,
                      is_deployed: self.is_deployed,
                      created_at: from_micros(self.created_at_ts)?,
                      updated_at: from_micros(self.updated_at_ts)? })
  }
}

impl VersionRow {
  fn from_version(version: &WorkflowVersion) -> Result<Self> {
    Ok(VersionRow { id: version.id.to_string(),
                    workflow_id: version.workflow_id.to_string(),
                    version: version.version,
                    document: version.document.to_canonical_string()?,
                    document_hash: version.document_hash.clone(),
                    change_log: version.change_log.clone(),
                    created_by: version.created_by.clone(),
                    created_at_ts: version.created_at.timestamp_micros() })
  }

  fn into_version(self) -> Result<WorkflowVersion> {
    let version = WorkflowVersion { id: parse_uuid(&self.id)?,
                                    workflow_id: parse_uuid(&self.workflow_id)?,
                                    version: self.version,
                                    document: serde_json::from_str::<WorkflowDocument>(&self.document)?,
                                    document_hash: self.document_hash,
                                    change_log: self.change_log,
                                    created_by: self.created_by,
                                    created_at: from_micros(self.created_at_ts)? };
    if !version.verify_integrity() {
      warn!("stored version {} of workflow {} does not match its hash", version.version, version.workflow_id);
    }
    Ok(version)
  }
}

/// Error interno de las transacciones: separa la colisión de versión del
/// resto de fallos para poder responder `PersistResult::Conflict`.
#[derive(Debug, thiserror::Error)]
enum TxError {
  #[error("version number already taken")]
  Conflict,
  #[error("db: {0}")]
  Db(DieselError),
  #[error(transparent)]
  Flow(#[from] FlowError),
}

impl From<DieselError> for TxError {
  fn from(e: DieselError) -> Self {
    match e {
      DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => TxError::Conflict,
      other => TxError::Db(other),
    }
  }
}

impl From<TxError> for FlowError {
  fn from(e: TxError) -> Self {
    match e {
      TxError::Conflict => FlowError::Conflict("version number already taken".into()),
      TxError::Db(e) => db_err(e),
      TxError::Flow(e) => e,
    }
  }
}

fn db_err(e: DieselError) -> FlowError {
  FlowError::Storage(format!("db: {}", e))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
  Uuid::parse_str(raw).map_err(|e| FlowError::Storage(format!("invalid uuid {}: {}", raw, e)))
}

fn from_micros(ts: i64) -> Result<DateTime<Utc>> {
  DateTime::<Utc>::from_timestamp_micros(ts).ok_or_else(|| FlowError::Storage(format!("invalid timestamp {}", ts)))
}

fn not_found(workflow_id: &Uuid) -> FlowError {
  FlowError::NotFound(format!("workflow {}", workflow_id))
}

fn load_meta(conn: &mut DbConn, workflow_id: &Uuid) -> Result<WorkflowMeta> {
  w_dsl::workflows.filter(w_dsl::id.eq(workflow_id.to_string()))
                  .first::<WorkflowRow>(conn)
                  .optional()
                  .map_err(db_err)?
                  .ok_or_else(|| not_found(workflow_id))?
                  .into_meta()
}

fn exists(conn: &mut DbConn, workflow_id: &Uuid) -> Result<bool> {
  let found = w_dsl::workflows.filter(w_dsl::id.eq(workflow_id.to_string()))
                              .select(w_dsl::id)
                              .first::<String>(conn)
                              .optional()
                              .map_err(db_err)?;
  Ok(found.is_some())
}

impl WorkflowRepository for DieselWorkflowRepository {
  fn get_workflow_meta(&self, workflow_id: &Uuid) -> Result<WorkflowMeta> {
    let mut conn = self.conn()?;
    load_meta(&mut conn, workflow_id)
  }

  fn create_workflow(&self,
                     owner_id: &str,
                     name: &str,
                     description: Option<String>,
                     document: &WorkflowDocument)
                     -> Result<Uuid> {
    let mut conn = self.conn()?;
    let id = Uuid::new_v4();
    let now = Utc::now().timestamp_micros();
    let row = WorkflowRow { id: id.to_string(),
                            owner_id: owner_id.to_string(),
                            name: name.to_string(),
                            description,
                            status: WorkflowStatus::Draft.as_str().to_string(),
                            document: document.to_canonical_string()?,
                            current_version: 0,
                            remote_id: None,
                            is_deployed: false,
                            created_at_ts: now,
                            updated_at_ts: now };
    diesel::insert_into(schema::workflows::table).values(&row).execute(&mut conn).map_err(db_err)?;
    debug!("workflow row {} inserted", id);
    Ok(id)
  }

  fn list_workflows(&self, owner_id: &str, options: &ListOptions) -> Result<Page<WorkflowMeta>> {
    let mut conn = self.conn()?;
    let mut count_query = w_dsl::workflows.filter(w_dsl::owner_id.eq(owner_id)).into_boxed();
    let mut page_query = w_dsl::workflows.filter(w_dsl::owner_id.eq(owner_id)).into_boxed();
    if let Some(status) = options.status {
      count_query = count_query.filter(w_dsl::status.eq(status.as_str()));
      page_query = page_query.filter(w_dsl::status.eq(status.as_str()));
    }
    let total = count_query.count().get_result::<i64>(&mut conn).map_err(db_err)?;
    let rows = page_query.order((w_dsl::updated_at_ts.desc(), w_dsl::id.asc()))
                         .offset(options.offset() as i64)
                         .limit(i64::from(options.page_size))
                         .load::<WorkflowRow>(&mut conn)
                         .map_err(db_err)?;
    let items = rows.into_iter().map(WorkflowRow::into_meta).collect::<Result<Vec<_>>>()?;
    Ok(Page::new(items, total.max(0) as u64, options))
  }

  fn persist_version(&self, version: &WorkflowVersion, expected_version: i64) -> Result<PersistResult> {
    let mut conn = self.conn()?;
    let row = VersionRow::from_version(version)?;
    let workflow_id = version.workflow_id;
    let now = Utc::now().timestamp_micros();
    // El UPDATE va primero: toma el lock de escritura antes de leer nada.
    let outcome = conn.transaction::<i64, TxError, _>(|conn| {
                        let updated = diesel::update(w_dsl::workflows.filter(w_dsl::id.eq(&row.workflow_id))
                                                                     .filter(w_dsl::current_version.eq(expected_version)))
                                      .set((w_dsl::current_version.eq(row.version),
                                            w_dsl::document.eq(&row.document),
                                            w_dsl::updated_at_ts.eq(now)))
                                      .execute(conn)?;
                        if updated == 0 {
                          return if exists(conn, &workflow_id)? {
                            Err(TxError::Conflict)
                          } else {
                            Err(not_found(&workflow_id).into())
                          };
                        }
                        if row.version != expected_version + 1 {
                          return Err(FlowError::Conflict(format!("version {} does not follow {}",
                                                                 row.version, expected_version)).into());
                        }
                        diesel::insert_into(schema::workflow_versions::table).values(&row).execute(conn)?;
                        Ok(row.version)
                      });
    match outcome {
      Ok(new_version) => Ok(PersistResult::Ok { new_version }),
      Err(TxError::Conflict) => {
        debug!("optimistic check failed for workflow {} (expected {})", workflow_id, expected_version);
        Ok(PersistResult::Conflict)
      }
      Err(e) => Err(e.into()),
    }
  }

  fn read_versions(&self, workflow_id: &Uuid) -> Result<Vec<WorkflowVersion>> {
    let mut conn = self.conn()?;
    let rows = v_dsl::workflow_versions.filter(v_dsl::workflow_id.eq(workflow_id.to_string()))
                                       .order(v_dsl::version.asc())
                                       .load::<VersionRow>(&mut conn)
                                       .map_err(db_err)?;
    rows.into_iter().map(VersionRow::into_version).collect()
  }

  fn get_version(&self, workflow_id: &Uuid, version: i64) -> Result<Option<WorkflowVersion>> {
    let mut conn = self.conn()?;
    let row = v_dsl::workflow_versions.filter(v_dsl::workflow_id.eq(workflow_id.to_string()))
                                      .filter(v_dsl::version.eq(version))
                                      .first::<VersionRow>(&mut conn)
                                      .optional()
                                      .map_err(db_err)?;
    row.map(VersionRow::into_version).transpose()
  }

  fn count_versions(&self, workflow_id: &Uuid) -> Result<i64> {
    let mut conn = self.conn()?;
    if !exists(&mut conn, workflow_id)? {
      return Ok(-1);
    }
    v_dsl::workflow_versions.filter(v_dsl::workflow_id.eq(workflow_id.to_string()))
                            .count()
                            .get_result::<i64>(&mut conn)
                            .map_err(db_err)
  }

  fn workflow_exists(&self, workflow_id: &Uuid) -> Result<bool> {
    let mut conn = self.conn()?;
    exists(&mut conn, workflow_id)
  }

  fn set_status(&self, workflow_id: &Uuid, status: WorkflowStatus) -> Result<WorkflowMeta> {
    let mut conn = self.conn()?;
    let updated = diesel::update(w_dsl::workflows.filter(w_dsl::id.eq(workflow_id.to_string())))
                    .set((w_dsl::status.eq(status.as_str()), w_dsl::updated_at_ts.eq(Utc::now().timestamp_micros())))
                    .execute(&mut conn)
                    .map_err(db_err)?;
    if updated == 0 {
      return Err(not_found(workflow_id));
    }
    load_meta(&mut conn, workflow_id)
  }

  fn mark_deployed(&self, workflow_id: &Uuid, remote_id: &str) -> Result<WorkflowMeta> {
    let mut conn = self.conn()?;
    let updated = diesel::update(w_dsl::workflows.filter(w_dsl::id.eq(workflow_id.to_string())))
                    .set((w_dsl::remote_id.eq(Some(remote_id)),
                          w_dsl::status.eq(WorkflowStatus::Deployed.as_str()),
                          w_dsl::is_deployed.eq(true),
                          w_dsl::updated_at_ts.eq(Utc::now().timestamp_micros())))
                    .execute(&mut conn)
                    .map_err(db_err)?;
    if updated == 0 {
      return Err(not_found(workflow_id));
    }
    load_meta(&mut conn, workflow_id)
  }

  fn delete_workflow(&self, workflow_id: &Uuid) -> Result<()> {
    let mut conn = self.conn()?;
    let id_s = workflow_id.to_string();
    conn.transaction::<(), TxError, _>(|conn| {
          diesel::delete(e_dsl::executions.filter(e_dsl::workflow_id.eq(&id_s))).execute(conn)?;
          diesel::delete(v_dsl::workflow_versions.filter(v_dsl::workflow_id.eq(&id_s))).execute(conn)?;
          let deleted = diesel::delete(w_dsl::workflows.filter(w_dsl::id.eq(&id_s))).execute(conn)?;
          if deleted == 0 {
            return Err(not_found(workflow_id).into());
          }
          Ok(())
        })?;
    debug!("workflow {} and its versions deleted", workflow_id);
    Ok(())
  }

  fn create_execution(&self, execution: &Execution) -> Result<()> {
    let mut conn = self.conn()?;
    if !exists(&mut conn, &execution.workflow_id)? {
      return Err(not_found(&execution.workflow_id));
    }
    let row = ExecutionRow::from_execution(execution)?;
    diesel::insert_into(schema::executions::table).values(&row).execute(&mut conn).map_err(db_err)?;
    Ok(())
  }

  fn get_execution(&self, execution_id: &Uuid) -> Result<Option<Execution>> {
    let mut conn = self.conn()?;
    let row = e_dsl::executions.filter(e_dsl::id.eq(execution_id.to_string()))
                               .first::<ExecutionRow>(&mut conn)
                               .optional()
                               .map_err(db_err)?;
    row.map(ExecutionRow::into_execution).transpose()
  }

  fn update_execution(&self, execution: &Execution) -> Result<()> {
    let mut conn = self.conn()?;
    let row = ExecutionRow::from_execution(execution)?;
    let updated = diesel::update(e_dsl::executions.filter(e_dsl::id.eq(&row.id)))
                    .set((e_dsl::status.eq(&row.status),
                          e_dsl::output_data.eq(&row.output_data),
                          e_dsl::error_message.eq(&row.error_message),
                          e_dsl::completed_at_ts.eq(row.completed_at_ts)))
                    .execute(&mut conn)
                    .map_err(db_err)?;
    if updated == 0 {
      return Err(FlowError::NotFound(format!("execution {}", execution.id)));
    }
    Ok(())
  }
}

/// Crea el repositorio desde las variables de entorno (ver
/// `FlowDbConfig::from_env`).
pub fn new_from_env() -> Result<DieselWorkflowRepository> {
  let config = FlowDbConfig::from_env()?;
  DieselWorkflowRepository::new(&config)
}

/// Repositorio sobre una URL SQLite explícita, sin leer el entorno. Útil en
/// tests con una base en memoria distinta por caso.
#[cfg(not(feature = "pg"))]
pub fn new_sqlite(database_url: &str) -> Result<DieselWorkflowRepository> {
  DieselWorkflowRepository::new(&FlowDbConfig::new(database_url))
}
