use serde_json::json;
use workflow_graph::{validate, validate_json, Connection, Node, WorkflowDocument};

fn scenario_a() -> serde_json::Value {
  json!({
    "name": "W",
    "nodes": [
      {"id": "n1", "name": "N1", "type": "t", "position": [0, 0]},
      {"id": "n2", "name": "N2", "type": "t", "position": [100, 0]}
    ],
    "connections": {"n1": [[{"node": "n2", "type": "main", "index": 0}]]}
  })
}

#[test]
fn empty_object_degrades_gracefully() {
  let report = validate_json(&json!({}));
  assert!(!report.is_valid);
  assert_eq!(report.errors,
             vec!["Workflow name is required",
                  "Workflow must have at least one node",
                  "Workflow must have connections object"]);
  assert!(report.nodes.is_empty());
  assert!(report.connections.is_empty());
  assert!(report.warnings.is_empty());
}

#[test]
fn non_object_inputs_never_panic() {
  for raw in [json!(null), json!(3), json!("text"), json!([{"id": "x"}]), json!({"nodes": null, "connections": null})] {
    let report = validate_json(&raw);
    assert!(!report.is_valid);
    assert_eq!(report.errors.len(), 3);
  }
}

#[test]
fn connected_pair_is_clean() {
  let report = validate_json(&scenario_a());
  assert!(report.is_valid);
  assert!(report.errors.is_empty());
  assert!(report.warnings.is_empty());
  assert_eq!(report.nodes.len(), 2);
  assert!(report.nodes.iter().all(|n| n.is_valid));
  assert_eq!(report.connections.len(), 1);
  assert_eq!(report.connections[0].from, "n1");
  assert_eq!(report.connections[0].to.as_deref(), Some("n2"));
  assert!(report.connections[0].is_valid);
}

#[test]
fn empty_connections_warn_for_each_node() {
  let mut raw = scenario_a();
  raw["connections"] = json!({});
  let report = validate_json(&raw);
  assert!(report.is_valid);
  assert_eq!(report.warnings,
             vec!["Node \"N1\" (n1) is not connected", "Node \"N2\" (n2) is not connected"]);
}

#[test]
fn dangling_target_stays_at_connection_level() {
  let mut raw = scenario_a();
  raw["connections"] = json!({"n1": [[{"node": "n3", "type": "main", "index": 0}]]});
  let report = validate_json(&raw);
  assert_eq!(report.connections.len(), 1);
  assert!(!report.connections[0].is_valid);
  assert_eq!(report.connections[0].errors, vec!["Target node n3 not found"]);
  assert!(report.errors.is_empty());
  assert!(report.is_valid);
  // n2 is no longer targeted by anything
  assert_eq!(report.warnings, vec!["Node \"N2\" (n2) is not connected"]);
}

#[test]
fn map_key_with_no_ports_is_not_orphan() {
  let report = validate_json(&json!({
    "name": "W",
    "nodes": [{"id": "solo", "name": "Solo", "type": "t", "position": [0, 0]}],
    "connections": {"solo": []}
  }));
  assert!(report.warnings.is_empty());
  assert!(report.connections.is_empty());
}

#[test]
fn report_serializes_camel_case() {
  let report = validate_json(&scenario_a());
  let value = serde_json::to_value(&report).unwrap();
  assert_eq!(value["isValid"], json!(true));
  assert_eq!(value["nodes"][0]["type"], json!("t"));
  assert_eq!(value["nodes"][0]["isValid"], json!(true));
  assert_eq!(value["connections"][0]["from"], json!("n1"));
}

#[test]
fn multiple_ports_are_walked_in_order() {
  let doc = WorkflowDocument::new("Branching").with_node(Node::new("if", "If", "n8n-nodes-base.if", 0.0, 0.0))
                                              .with_node(Node::new("yes", "Yes", "t", 200.0, -100.0))
                                              .with_node(Node::new("no", "No", "t", 200.0, 100.0))
                                              .connect("if", 0, Connection::main("yes", 0))
                                              .connect("if", 1, Connection::main("no", 0))
                                              .connect("if", 1, Connection::main("missing", 0));
  let report = validate(&doc);
  let order: Vec<_> = report.connections.iter().map(|c| c.to.clone().unwrap()).collect();
  assert_eq!(order, vec!["yes", "no", "missing"]);
  assert_eq!(report.invalid_connections().count(), 1);
  assert!(report.warnings.is_empty());
}
