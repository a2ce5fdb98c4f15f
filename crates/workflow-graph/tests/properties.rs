use proptest::prelude::*;
use serde_json::{json, Value};
use workflow_graph::{validate, validate_json, WorkflowDocument};

// Arbitrary JSON, including shapes that look nothing like a workflow.
fn any_json() -> impl Strategy<Value = Value> {
  let leaf = prop_oneof![Just(Value::Null),
                         any::<bool>().prop_map(Value::Bool),
                         any::<i32>().prop_map(|n| json!(n)),
                         "[a-z0-9]{0,4}".prop_map(Value::String)];
  leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                    prop::collection::vec(("[a-z]{1,3}", inner), 0..4).prop_map(|entries| {
                                                                          Value::Object(entries.into_iter().collect())
                                                                        })]
      })
}

// Workflow-shaped JSON drawing ids from a small pool so that hits and misses
// both happen.
fn workflow_json() -> impl Strategy<Value = Value> {
  let id = prop::sample::select(vec!["a", "b", "c", "d"]);
  let node = (id.clone(), prop::option::of("[A-Z][a-z]{0,3}"), prop::bool::ANY).prop_map(|(id, name, placed)| {
                                                                               let mut node = json!({"id": id, "type": "t"});
                                                                               if let Some(name) = name {
                                                                                 node["name"] = json!(name);
                                                                               }
                                                                               if placed {
                                                                                 node["position"] = json!([0, 0]);
                                                                               }
                                                                               node
                                                                             });
  let wire = id.clone().prop_map(|target| json!({"node": target, "type": "main", "index": 0}));
  let groups = prop::collection::vec(prop::collection::vec(wire, 0..3), 0..3);
  (prop::option::of("[a-z ]{0,6}"),
   prop::collection::vec(node, 0..5),
   prop::collection::vec((id, groups), 0..4)).prop_map(|(name, nodes, edges)| {
                                                 let connections: serde_json::Map<String, Value> =
                                                   edges.into_iter().map(|(k, v)| (k.to_string(), json!(v))).collect();
                                                 json!({"name": name, "nodes": nodes, "connections": connections})
                                               })
}

proptest! {
  #[test]
  fn validation_is_deterministic(raw in workflow_json()) {
    let first = serde_json::to_string(&validate_json(&raw)).unwrap();
    let second = serde_json::to_string(&validate_json(&raw)).unwrap();
    prop_assert_eq!(first, second);
  }

  #[test]
  fn arbitrary_json_never_panics(raw in any_json()) {
    let report = validate_json(&raw);
    prop_assert_eq!(report.is_valid, report.errors.is_empty());
  }

  #[test]
  fn validity_ignores_warnings_and_wires(raw in workflow_json()) {
    let report = validate_json(&raw);
    prop_assert_eq!(report.is_valid, report.errors.is_empty());
    prop_assert!(report.errors.len() <= 3);
  }

  #[test]
  fn document_round_trip_keeps_report(raw in workflow_json()) {
    let doc = WorkflowDocument::from_json(&raw);
    let again = WorkflowDocument::from_json(&doc.to_json().unwrap());
    prop_assert_eq!(validate(&doc), validate(&again));
  }
}
