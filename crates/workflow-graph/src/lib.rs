//! workflow-graph: modelo de documentos de workflow y su validador
//!
//! Un `WorkflowDocument` describe un grafo dirigido al estilo n8n: una lista
//! ordenada de nodos y un mapa de conexiones `source -> puertos -> cables`.
//! El crate expone:
//! - los tipos del documento (`WorkflowDocument`, `Node`, `Connection`) con
//!   deserialización tolerante: cualquier JSON produce un documento,
//! - `OpaqueValue`, el tipo suma para los blobs JSON que no se interpretan,
//! - `validate` / `validate_json`, que nunca fallan y devuelven un
//!   `ValidationReport` completo.

mod document;
mod errors;
mod report;
mod validator;
mod value;

pub use document::{Connection, ConnectionGroup, ConnectionMap, DocumentPatch, Node, WorkflowDocument};
pub use errors::GraphError;
pub use report::{ConnectionReport, NodeReport, ValidationReport};
pub use validator::{validate, validate_json};
pub use value::OpaqueValue;
