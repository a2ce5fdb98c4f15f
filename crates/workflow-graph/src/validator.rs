// validator.rs
use crate::report::{ConnectionReport, NodeReport, ValidationReport};
use crate::{ConnectionMap, Node, WorkflowDocument};
use serde_json::Value as JsonValue;
use std::collections::HashSet;

/// Valida la estructura de un documento de workflow.
///
/// Función pura: sin E/S ni estado compartido, y el orden de cada lista del
/// reporte sigue el orden de entrada (nodos en orden de documento, conexiones
/// en orden mapa -> puerto -> cable). Todas las comprobaciones se acumulan.
///
/// Los errores de conexión sólo se registran en `connections` y no pasan a
/// `errors`, de modo que un cable colgante no invalida el documento.
pub fn validate(document: &WorkflowDocument) -> ValidationReport {
  let mut errors = Vec::new();

  if document.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
    errors.push("Workflow name is required".to_string());
  }
  if document.nodes.is_empty() {
    errors.push("Workflow must have at least one node".to_string());
  }
  if document.connections.is_none() {
    errors.push("Workflow must have connections object".to_string());
  }

  let nodes = document.nodes.iter().map(validate_node).collect();

  let empty = ConnectionMap::new();
  let connection_map = document.connections.as_ref().unwrap_or(&empty);
  let known: HashSet<&str> = document.nodes.iter().filter_map(|n| n.id.as_deref()).collect();
  let connections = validate_connections(connection_map, &known);
  let warnings = orphan_warnings(&document.nodes, connection_map);

  ValidationReport { is_valid: errors.is_empty(), errors, warnings, nodes, connections }
}

/// Igual que [`validate`] pero desde JSON arbitrario (cuerpo de petición,
/// fila de base de datos). Nunca falla.
pub fn validate_json(raw: &JsonValue) -> ValidationReport {
  validate(&WorkflowDocument::from_json(raw))
}

fn validate_node(node: &Node) -> NodeReport {
  let mut errors = Vec::new();
  if is_blank(&node.id) {
    errors.push("Node ID is required".to_string());
  }
  if is_blank(&node.name) {
    errors.push("Node name is required".to_string());
  }
  if is_blank(&node.node_type) {
    errors.push("Node type is required".to_string());
  }
  if node.position_xy().is_none() {
    errors.push("Node position must be [x, y] coordinates".to_string());
  }
  NodeReport { id: node.id.clone(),
               name: node.name.clone(),
               node_type: node.node_type.clone(),
               is_valid: errors.is_empty(),
               errors }
}

fn validate_connections(connection_map: &ConnectionMap, known: &HashSet<&str>) -> Vec<ConnectionReport> {
  let mut reports = Vec::new();
  for (source, groups) in connection_map {
    for connection in groups.iter().flatten() {
      let mut errors = Vec::new();
      if !known.contains(source.as_str()) {
        errors.push(format!("Source node {} not found", source));
      }
      match connection.node.as_deref() {
        Some(target) if known.contains(target) => {}
        Some(target) => errors.push(format!("Target node {} not found", target)),
        None => errors.push("Connection target node is required".to_string()),
      }
      reports.push(ConnectionReport { from: source.clone(),
                                      to: connection.node.clone(),
                                      is_valid: errors.is_empty(),
                                      errors });
    }
  }
  reports
}

// A node counts as connected when it is targeted by some wire or when it is
// a key of the connection map, even with no outgoing ports.
fn orphan_warnings(nodes: &[Node], connection_map: &ConnectionMap) -> Vec<String> {
  let targets: HashSet<&str> =
    connection_map.values().flatten().flatten().filter_map(|c| c.node.as_deref()).collect();
  nodes.iter()
       .filter(|node| {
         node.id.as_deref().is_none_or(|id| !targets.contains(id) && !connection_map.contains_key(id))
       })
       .map(|node| {
         format!("Node \"{}\" ({}) is not connected",
                 node.name.as_deref().unwrap_or_default(),
                 node.id.as_deref().unwrap_or_default())
       })
       .collect()
}

fn is_blank(field: &Option<String>) -> bool {
  field.as_deref().is_none_or(str::is_empty)
}
