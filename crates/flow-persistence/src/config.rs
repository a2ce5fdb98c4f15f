//! Configuración de la base de datos leída del entorno (`.env` incluido).
use flow::errors::FlowError;

/// URL por defecto sin `pg`: archivo SQLite en el directorio actual, así los
/// workflows sobreviven entre ejecuciones de la CLI.
pub const DEFAULT_SQLITE_URL: &str = "flow.db";
pub const DEFAULT_POOL_SIZE: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowDbConfig {
  pub database_url: String,
  pub pool_size: u32,
}

impl FlowDbConfig {
  pub fn new(database_url: impl Into<String>) -> Self {
    Self { database_url: database_url.into(), pool_size: DEFAULT_POOL_SIZE }
  }

  /// Lee `FLOW_DB_URL` (o `DATABASE_URL`) y `FLOW_DB_POOL_SIZE`.
  ///
  /// Con la feature `pg` la URL es obligatoria y debe parecer de Postgres;
  /// sin ella se usa el archivo SQLite `flow.db` si no hay ninguna definida.
  pub fn from_env() -> Result<Self, FlowError> {
    dotenvy::dotenv().ok();
    let url = std::env::var("FLOW_DB_URL").or_else(|_| std::env::var("DATABASE_URL")).ok();
    let pool_size = match std::env::var("FLOW_DB_POOL_SIZE") {
      Ok(raw) => parse_pool_size(&raw)?,
      Err(_) => DEFAULT_POOL_SIZE,
    };
    let database_url = resolve_url(url)?;
    Ok(Self { database_url, pool_size })
  }
}

fn parse_pool_size(raw: &str) -> Result<u32, FlowError> {
  match raw.trim().parse::<u32>() {
    Ok(n) if n > 0 => Ok(n),
    _ => Err(FlowError::Validation(format!("FLOW_DB_POOL_SIZE inválido: {}", raw))),
  }
}

#[cfg(feature = "pg")]
fn resolve_url(url: Option<String>) -> Result<String, FlowError> {
  let url = url.ok_or_else(|| FlowError::Storage("FLOW_DB_URL / DATABASE_URL not set".into()))?;
  if !looks_like_postgres(&url) {
    return Err(FlowError::Storage("FLOW_DB_URL / DATABASE_URL does not look like Postgres URL".into()));
  }
  Ok(url)
}

#[cfg(not(feature = "pg"))]
fn resolve_url(url: Option<String>) -> Result<String, FlowError> {
  match url {
    Some(url) if looks_like_postgres(&url) => {
      Err(FlowError::Storage("flow-persistence was compiled without 'pg' feature; enable the 'pg' feature to use \
                              Postgres"
                                       .into()))
    }
    Some(url) => Ok(url),
    None => Ok(DEFAULT_SQLITE_URL.to_string()),
  }
}

fn looks_like_postgres(url: &str) -> bool {
  let l = url.to_lowercase();
  l.starts_with("postgres://") || l.starts_with("postgresql://")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pool_size_must_be_positive() {
    assert_eq!(parse_pool_size(" 8 ").unwrap(), 8);
    assert!(parse_pool_size("0").is_err());
    assert!(parse_pool_size("many").is_err());
  }

  #[cfg(not(feature = "pg"))]
  #[test]
  fn sqlite_build_defaults_to_file() {
    assert_eq!(resolve_url(None).unwrap(), "flow.db");
    assert!(!DEFAULT_SQLITE_URL.contains("mode=memory"));
    assert_eq!(resolve_url(Some("file:other?mode=memory".into())).unwrap(), "file:other?mode=memory");
    assert!(resolve_url(Some("postgres://u:p@localhost/db".into())).is_err());
  }

  #[cfg(feature = "pg")]
  #[test]
  fn pg_build_requires_postgres_url() {
    assert!(resolve_url(None).is_err());
    assert!(resolve_url(Some("file:x".into())).is_err());
    assert!(resolve_url(Some("postgresql://localhost/db".into())).is_ok());
  }
}
