// document.rs
use crate::{GraphError, OpaqueValue};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value as JsonValue};

/// Cables de un puerto de salida.
pub type ConnectionGroup = Vec<Connection>;

/// `source node id -> puertos de salida -> cables`. El índice del puerto es
/// la posición dentro del vector externo, así que nunca se aplana.
pub type ConnectionMap = IndexMap<String, Vec<ConnectionGroup>>;

/// Documento de workflow tal y como viaja por la red (JSON camelCase).
///
/// La deserialización es tolerante: un campo ausente o con forma incorrecta
/// se trata como ausente en lugar de abortar. Así el validador siempre recibe
/// un documento y puede reportar cada problema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, deserialize_with = "lenient_nodes")]
  pub nodes: Vec<Node>,
  #[serde(default, deserialize_with = "lenient_connections", skip_serializing_if = "Option::is_none")]
  pub connections: Option<ConnectionMap>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub settings: Option<OpaqueValue>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub static_data: Option<OpaqueValue>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tags: Option<OpaqueValue>,
}

/// Nodo del grafo. `type` es opaco: no se comprueba contra ningún registro.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(rename = "type", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub node_type: Option<String>,
  #[serde(default, deserialize_with = "lenient_or_default")]
  pub parameters: IndexMap<String, OpaqueValue>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<OpaqueValue>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub type_version: Option<Number>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// Cable hacia el puerto de entrada `index` del nodo `node`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub node: Option<String>,
  #[serde(rename = "type", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub connection_type: Option<String>,
  #[serde(default, deserialize_with = "lenient_or_default")]
  pub index: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub type_data: Option<OpaqueValue>,
}

/// Actualización parcial de un documento: cada campo presente reemplaza al
/// del documento actual (merge superficial).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub nodes: Option<Vec<Node>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub connections: Option<ConnectionMap>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub settings: Option<OpaqueValue>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub static_data: Option<OpaqueValue>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tags: Option<OpaqueValue>,
}

impl WorkflowDocument {
  /// Documento vacío con nombre y mapa de conexiones presente.
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: Some(name.into()), connections: Some(ConnectionMap::new()), ..Default::default() }
  }

  pub fn with_node(mut self, node: Node) -> Self {
    self.nodes.push(node);
    self
  }

  /// Añade `connection` al puerto `port` de `source`, creando los puertos
  /// intermedios vacíos si hace falta.
  pub fn connect(mut self, source: &str, port: usize, connection: Connection) -> Self {
    let groups = self.connections.get_or_insert_with(ConnectionMap::new).entry(source.to_string()).or_default();
    if groups.len() <= port {
      groups.resize_with(port + 1, Vec::new);
    }
    groups[port].push(connection);
    self
  }

  /// Construye un documento a partir de cualquier JSON. Nunca falla: lo que
  /// no es un objeto produce un documento vacío (sin `connections`).
  pub fn from_json(raw: &JsonValue) -> Self {
    match raw {
      JsonValue::Object(_) => serde_json::from_value(raw.clone()).unwrap_or_default(),
      _ => Self::default(),
    }
  }

  /// Lee un documento desde texto JSON. Falla sólo si el texto no es JSON o
  /// si la raíz no es un objeto.
  pub fn parse_str(text: &str) -> Result<Self, GraphError> {
    let raw: JsonValue = serde_json::from_str(text)?;
    if !raw.is_object() {
      return Err(GraphError::InvalidDocument("la raíz del documento debe ser un objeto JSON".to_string()));
    }
    Ok(Self::from_json(&raw))
  }

  pub fn to_json(&self) -> Result<JsonValue, GraphError> {
    Ok(serde_json::to_value(self)?)
  }

  /// Serialización compacta y estable (el orden sale de los vectores y de
  /// los `IndexMap`), usada para calcular digests.
  pub fn to_canonical_string(&self) -> Result<String, GraphError> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn node(&self, id: &str) -> Option<&Node> {
    self.nodes.iter().find(|n| n.id.as_deref() == Some(id))
  }

  pub fn apply_patch(&self, patch: &DocumentPatch) -> Self {
    let mut merged = self.clone();
    if let Some(name) = &patch.name {
      merged.name = Some(name.clone());
    }
    if let Some(nodes) = &patch.nodes {
      merged.nodes = nodes.clone();
    }
    if let Some(connections) = &patch.connections {
      merged.connections = Some(connections.clone());
    }
    if let Some(settings) = &patch.settings {
      merged.settings = Some(settings.clone());
    }
    if let Some(static_data) = &patch.static_data {
      merged.static_data = Some(static_data.clone());
    }
    if let Some(tags) = &patch.tags {
      merged.tags = Some(tags.clone());
    }
    merged
  }
}

impl Node {
  pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: impl Into<String>, x: f64, y: f64) -> Self {
    Self { id: Some(id.into()),
           name: Some(name.into()),
           node_type: Some(node_type.into()),
           position: Some(OpaqueValue::Array(vec![OpaqueValue::from(x), OpaqueValue::from(y)])),
           ..Default::default() }
  }

  pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<OpaqueValue>) -> Self {
    self.parameters.insert(key.into(), value.into());
    self
  }

  /// Versión de la definición del tipo; 1 cuando no se indica.
  pub fn type_version(&self) -> Number {
    self.type_version.clone().unwrap_or_else(|| Number::from(1))
  }

  /// Coordenadas `(x, y)` si `position` es un par numérico.
  pub fn position_xy(&self) -> Option<(f64, f64)> {
    match self.position.as_ref()?.as_array()? {
      [x, y] => Some((x.as_f64()?, y.as_f64()?)),
      _ => None,
    }
  }

  fn from_json_lossy(raw: JsonValue) -> Self {
    match raw {
      JsonValue::Object(_) => serde_json::from_value(raw).unwrap_or_default(),
      _ => Self::default(),
    }
  }
}

impl Connection {
  /// Cable por el canal `main`, el habitual en n8n.
  pub fn main(target: impl Into<String>, index: i64) -> Self {
    Self { node: Some(target.into()), connection_type: Some("main".to_string()), index, type_data: None }
  }

  fn from_json_lossy(raw: JsonValue) -> Self {
    match raw {
      JsonValue::Object(_) => serde_json::from_value(raw).unwrap_or_default(),
      _ => Self::default(),
    }
  }
}

// Helpers de deserialización tolerante: primero se lee el JSON crudo y
// después se intenta la conversión; una forma incorrecta se vuelve `None`.

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
  where D: Deserializer<'de>,
        T: DeserializeOwned
{
  let raw = JsonValue::deserialize(deserializer)?;
  Ok(serde_json::from_value(raw).ok())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
  where D: Deserializer<'de>,
        T: DeserializeOwned + Default
{
  Ok(lenient(deserializer)?.unwrap_or_default())
}

fn lenient_nodes<'de, D>(deserializer: D) -> Result<Vec<Node>, D::Error>
  where D: Deserializer<'de>
{
  let raw = JsonValue::deserialize(deserializer)?;
  Ok(match raw {
    JsonValue::Array(items) => items.into_iter().map(Node::from_json_lossy).collect(),
    _ => Vec::new(),
  })
}

fn lenient_connections<'de, D>(deserializer: D) -> Result<Option<ConnectionMap>, D::Error>
  where D: Deserializer<'de>
{
  let raw = JsonValue::deserialize(deserializer)?;
  let JsonValue::Object(entries) = raw else {
    return Ok(None);
  };
  Ok(Some(entries.into_iter().map(|(source, groups)| (source, lenient_groups(groups))).collect()))
}

fn lenient_groups(raw: JsonValue) -> Vec<ConnectionGroup> {
  let JsonValue::Array(groups) = raw else {
    return Vec::new();
  };
  groups.into_iter()
        .map(|group| match group {
          JsonValue::Array(wires) => wires.into_iter().map(Connection::from_json_lossy).collect(),
          _ => Vec::new(),
        })
        .collect()
}
