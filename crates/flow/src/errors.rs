// Archivo: errors.rs
// Propósito: definir los errores del dominio de versiones y el alias
// Result<T> usado por las APIs del crate.
use thiserror::Error;
use workflow_graph::GraphError;

/// Errores comunes del dominio de workflows.
///
/// - `NotFound`: workflow o versión inexistente (o de otro propietario).
/// - `Conflict`: conflicto de concurrencia o de numeración de versiones.
/// - `Validation`: el documento no es desplegable.
/// - `Storage`: error al acceder al almacenamiento.
/// - `External`: fallo del motor de automatización.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// Entidad no encontrada (workflow o versión).
    #[error("No encontrado: {0}")]
    NotFound(String),
    /// Conflicto optimista (version/expected mismatch) o versión duplicada.
    #[error("Conflicto: {0}")]
    Conflict(String),
    /// Documento estructuralmente inválido para la operación pedida.
    #[error("Error de validación: {0}")]
    Validation(String),
    /// Error de serialización del documento.
    #[error("Error de serialización: {0}")]
    Serialization(String),
    /// Error genérico de almacenamiento (BD, pool, mutex).
    #[error("Error de almacenamiento: {0}")]
    Storage(String),
    /// Error del motor de automatización externo.
    #[error("Error externo: {0}")]
    External(String),
    /// Otro tipo de error.
    #[error("Otro: {0}")]
    Other(String),
}

impl FlowError {
    /// Código estable para envelopes JSON.
    pub fn code(&self) -> &'static str {
        match self {
            FlowError::NotFound(_) => "NOT_FOUND",
            FlowError::Conflict(_) => "CONFLICT",
            FlowError::Validation(_) => "VALIDATION_ERROR",
            FlowError::Serialization(_) => "SERIALIZATION_ERROR",
            FlowError::Storage(_) => "STORAGE_ERROR",
            FlowError::External(_) => "EXTERNAL_ERROR",
            FlowError::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Estado HTTP equivalente para la capa de API.
    pub fn http_status(&self) -> u16 {
        match self {
            FlowError::NotFound(_) => 404,
            FlowError::Conflict(_) => 409,
            FlowError::Validation(_) | FlowError::Serialization(_) => 400,
            FlowError::External(_) => 502,
            FlowError::Storage(_) | FlowError::Other(_) => 500,
        }
    }

    /// Mensaje sin el prefijo de la variante.
    pub fn message(&self) -> &str {
        match self {
            FlowError::NotFound(m)
            | FlowError::Conflict(m)
            | FlowError::Validation(m)
            | FlowError::Serialization(m)
            | FlowError::Storage(m)
            | FlowError::External(m)
            | FlowError::Other(m) => m,
        }
    }
}

impl From<GraphError> for FlowError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::SerializationError(m) => FlowError::Serialization(m),
            GraphError::InvalidDocument(m) => FlowError::Validation(m),
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(e: serde_json::Error) -> Self {
        FlowError::Serialization(e.to_string())
    }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, FlowError>;
