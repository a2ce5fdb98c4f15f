// errors.rs
use thiserror::Error;

/// Errores del crate. La validación estructural nunca produce errores: sólo
/// la lectura/escritura del documento como texto puede fallar.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
  #[error("Error de serialización: {0}")]
  SerializationError(String),
  #[error("Documento inválido: {0}")]
  InvalidDocument(String),
}

impl From<serde_json::Error> for GraphError {
  fn from(e: serde_json::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}
