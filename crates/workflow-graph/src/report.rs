// report.rs
use serde::{Deserialize, Serialize};

/// Resultado completo de validar un documento.
///
/// `is_valid` depende únicamente de `errors`: los avisos (`warnings`) y los
/// errores por conexión no cambian la validez del documento.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
  pub is_valid: bool,
  pub errors: Vec<String>,
  pub warnings: Vec<String>,
  pub nodes: Vec<NodeReport>,
  pub connections: Vec<ConnectionReport>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReport {
  pub id: Option<String>,
  pub name: Option<String>,
  #[serde(rename = "type")]
  pub node_type: Option<String>,
  pub is_valid: bool,
  pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
  pub from: String,
  pub to: Option<String>,
  pub is_valid: bool,
  pub errors: Vec<String>,
}

impl ValidationReport {
  /// Nodos con al menos un error.
  pub fn invalid_nodes(&self) -> impl Iterator<Item = &NodeReport> {
    self.nodes.iter().filter(|n| !n.is_valid)
  }

  /// Conexiones con al menos un error (no afectan a `is_valid`).
  pub fn invalid_connections(&self) -> impl Iterator<Item = &ConnectionReport> {
    self.connections.iter().filter(|c| !c.is_valid)
  }

  /// Mensaje de una línea con los errores a nivel documento.
  pub fn error_summary(&self) -> String {
    self.errors.join(", ")
  }
}
