#![cfg(not(feature = "pg"))]

use flow::domain::{DeployOptions, Execution, ExecutionStatus, ListOptions, NewWorkflow, PersistResult, RemoteExecution,
                   WorkflowStatus, WorkflowVersion};
use flow::errors::FlowError;
use flow::repository::WorkflowRepository;
use flow::stubs::InMemoryAutomationClient;
use flow::{VersionController, WorkflowService};
use flow_persistence::{new_sqlite, DieselWorkflowRepository};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use uuid::Uuid;
use workflow_graph::{Connection, DocumentPatch, Node, WorkflowDocument};

fn setup_repo() -> DieselWorkflowRepository {
  // Base en memoria distinta por test
  let url = format!("file:wf_{}?mode=memory&cache=shared", Uuid::new_v4().simple());
  new_sqlite(&url).expect("sqlite repo")
}

fn doc(name: &str) -> WorkflowDocument {
  WorkflowDocument::new(name).with_node(Node::new("a", "A", "n8n-nodes-base.start", 0.0, 0.0))
                             .with_node(Node::new("b", "B", "n8n-nodes-base.set", 200.0, 0.0))
                             .connect("a", 0, Connection::main("b", 0))
}

#[test]
fn create_and_read_workflow_meta() {
  let repo = setup_repo();
  let id = repo.create_workflow("alice", "Demo", Some("desc".into()), &doc("Demo")).expect("create");
  let meta = repo.get_workflow_meta(&id).expect("meta");
  assert_eq!(meta.id, id);
  assert_eq!(meta.owner_id, "alice");
  assert_eq!(meta.description.as_deref(), Some("desc"));
  assert_eq!(meta.status, WorkflowStatus::Draft);
  assert_eq!(meta.current_version, 0);
  assert_eq!(meta.document, doc("Demo"));
  assert!(!meta.is_deployed);
  assert_eq!(repo.count_versions(&id).expect("count"), 0);
  assert_eq!(repo.count_versions(&Uuid::new_v4()).expect("count"), -1);
  assert!(matches!(repo.get_workflow_meta(&Uuid::new_v4()), Err(FlowError::NotFound(_))));
}

#[test]
fn persist_version_enforces_expected_counter() {
  let repo = setup_repo();
  let id = repo.create_workflow("alice", "Demo", None, &doc("Demo")).expect("create");

  let v1 = WorkflowVersion::new(id, 1, doc("v1"), "Initial version", "alice").expect("v1");
  assert_eq!(repo.persist_version(&v1, 0).expect("persist"), PersistResult::Ok { new_version: 1 });

  // contador desactualizado
  let stale = WorkflowVersion::new(id, 1, doc("stale"), "stale", "bob").expect("stale");
  assert_eq!(repo.persist_version(&stale, 0).expect("persist"), PersistResult::Conflict);

  // número que no sigue al esperado
  let skipped = WorkflowVersion::new(id, 3, doc("skip"), "skip", "bob").expect("skip");
  assert!(matches!(repo.persist_version(&skipped, 1), Err(FlowError::Conflict(_))));

  let missing = WorkflowVersion::new(Uuid::new_v4(), 1, doc("x"), "x", "bob").expect("x");
  assert!(matches!(repo.persist_version(&missing, 0), Err(FlowError::NotFound(_))));

  let meta = repo.get_workflow_meta(&id).expect("meta");
  assert_eq!(meta.current_version, 1);
  assert_eq!(meta.document, doc("v1"));
  assert_eq!(repo.count_versions(&id).expect("count"), 1);
}

#[test]
fn versions_round_trip_unchanged() {
  let repo = Arc::new(setup_repo());
  let id = repo.create_workflow("alice", "Demo", None, &doc("Demo")).expect("create");
  let vc = VersionController::new(repo.clone());
  let v1 = vc.create_initial_version(id, doc("one"), "alice").expect("v1");
  vc.create_next_version(id, doc("two"), "alice", "second").expect("v2");

  let stored = repo.get_version(&id, 1).expect("read").expect("exists");
  assert_eq!(stored.id, v1.id);
  assert_eq!(stored.document, v1.document);
  assert_eq!(stored.document_hash, v1.document_hash);
  assert_eq!(stored.change_log, "Initial version");
  assert_eq!(stored.created_at.timestamp_micros(), v1.created_at.timestamp_micros());
  assert!(stored.verify_integrity());
  assert!(repo.get_version(&id, 9).expect("read").is_none());

  let numbers: Vec<i64> = repo.read_versions(&id).expect("read").iter().map(|v| v.version).collect();
  assert_eq!(numbers, vec![1, 2]);
}

#[test]
fn lost_race_is_reported_as_conflict() {
  let repo = Arc::new(setup_repo());
  let id = repo.create_workflow("alice", "Demo", None, &doc("Demo")).expect("create");
  let vc = VersionController::new(repo.clone());
  vc.create_initial_version(id, doc("1"), "a").expect("v1");
  vc.create_next_version(id, doc("2"), "a", "2").expect("v2");
  vc.create_next_version(id, doc("3"), "a", "3").expect("v3");

  let winner = vc.append_version(id, 3, doc("w"), "w", "winner").expect("winner");
  assert_eq!(winner.version, 4);
  assert!(matches!(vc.append_version(id, 3, doc("l"), "l", "loser"), Err(FlowError::Conflict(_))));
  assert_eq!(vc.create_next_version(id, doc("l"), "l", "retry").expect("retry").version, 5);

  let restored = vc.restore_version(id, 2, "a").expect("restore");
  assert_eq!(restored.version.version, 6);
  assert_eq!(restored.version.change_log, "Restored from version 2");
  assert_eq!(repo.get_workflow_meta(&id).expect("meta").document, doc("2"));
}

#[test]
fn list_filters_and_paginates() {
  let repo = setup_repo();
  let mut ids = Vec::new();
  for i in 0..3 {
    ids.push(repo.create_workflow("alice", &format!("wf-{}", i), None, &doc("x")).expect("create"));
  }
  repo.create_workflow("bob", "other", None, &doc("x")).expect("create");
  repo.set_status(&ids[1], WorkflowStatus::Archived).expect("archive");

  let all = repo.list_workflows("alice", &ListOptions::default()).expect("list");
  assert_eq!(all.total, 3);
  assert_eq!(all.items.len(), 3);
  assert!(!all.has_more);
  // el archivado es el más reciente
  assert_eq!(all.items[0].id, ids[1]);

  let paged = repo.list_workflows("alice", &ListOptions { status: None, page: 1, page_size: 2 }).expect("list");
  assert_eq!(paged.items.len(), 2);
  assert!(paged.has_more);

  let drafts = ListOptions { status: Some(WorkflowStatus::Draft), ..Default::default() };
  let page = repo.list_workflows("alice", &drafts).expect("list");
  assert_eq!(page.total, 2);
  assert!(page.items.iter().all(|w| w.status == WorkflowStatus::Draft));
}

#[test]
fn mark_deployed_and_delete_cascade() {
  let repo = Arc::new(setup_repo());
  let id = repo.create_workflow("alice", "Demo", None, &doc("Demo")).expect("create");
  VersionController::new(repo.clone()).create_initial_version(id, doc("Demo"), "alice").expect("v1");

  let meta = repo.mark_deployed(&id, "17").expect("mark");
  assert!(meta.is_deployed);
  assert_eq!(meta.status, WorkflowStatus::Deployed);
  assert_eq!(meta.remote_id.as_deref(), Some("17"));

  repo.delete_workflow(&id).expect("delete");
  assert!(!repo.workflow_exists(&id).expect("exists"));
  assert!(repo.read_versions(&id).expect("read").is_empty());
  assert!(matches!(repo.delete_workflow(&id), Err(FlowError::NotFound(_))));
  assert!(matches!(repo.mark_deployed(&id, "18"), Err(FlowError::NotFound(_))));
}

#[test]
fn service_runs_on_diesel_repository() {
  let repo = Arc::new(setup_repo());
  let automation = Arc::new(InMemoryAutomationClient::default());
  let svc = WorkflowService::new(repo.clone(), automation.clone());
  let request = NewWorkflow { name: "Demo".into(), description: None, document: doc("Demo"), change_log: None };
  let meta = svc.create_workflow("alice", request).expect("create");

  let patch = DocumentPatch { name: Some("Demo 2".into()), ..Default::default() };
  let updated = svc.update_workflow(meta.id, "alice", &patch).expect("update");
  assert_eq!(updated.current_version, 2);

  let deployment = svc.deploy_workflow(meta.id, "alice", DeployOptions { activate: true }).expect("deploy");
  assert!(automation.remote(&deployment.remote_id).expect("remote").active);
  assert!(repo.get_workflow_meta(&meta.id).expect("meta").is_deployed);

  let history = svc.version_history(meta.id, "alice").expect("history");
  assert_eq!(history.iter().map(|v| v.version).collect::<Vec<_>>(), vec![2, 1]);

  svc.delete_workflow(meta.id, "alice").expect("delete");
  assert!(automation.remote(&deployment.remote_id).is_none());
}

#[test]
fn threaded_writers_conflict_without_gaps() {
  let repo = Arc::new(setup_repo());
  let id = repo.create_workflow("alice", "Demo", None, &doc("Demo")).expect("create");
  let vc = Arc::new(VersionController::new(repo.clone()));
  vc.create_initial_version(id, doc("seed"), "seed").expect("v1");

  let handles: Vec<_> = (0..8).map(|t| {
                                let vc = vc.clone();
                                thread::spawn(move || {
                                  let mut won = Vec::new();
                                  let mut lost = 0usize;
                                  for i in 0..20 {
                                    match vc.create_next_version(id, doc(&format!("{}-{}", t, i)), "w", "edit") {
                                      Ok(v) => won.push(v.version),
                                      Err(FlowError::Conflict(_)) => lost += 1,
                                      Err(other) => panic!("unexpected error: {:?}", other),
                                    }
                                  }
                                  (won, lost)
                                })
                              })
                              .collect();
  let mut won: Vec<i64> = Vec::new();
  let mut lost = 0usize;
  for h in handles {
    let (w, l) = h.join().expect("thread");
    won.extend(w);
    lost += l;
  }

  assert_eq!(won.len() + lost, 160);
  let unique: HashSet<i64> = won.iter().copied().collect();
  assert_eq!(unique.len(), won.len());
  let numbers: Vec<i64> = repo.read_versions(&id).expect("read").iter().map(|v| v.version).collect();
  assert_eq!(numbers, (1..=won.len() as i64 + 1).collect::<Vec<_>>());
  assert_eq!(repo.get_workflow_meta(&id).expect("meta").current_version, won.len() as i64 + 1);
}

#[test]
fn executions_round_trip_and_cascade() {
  let repo = setup_repo();
  let id = repo.create_workflow("alice", "Demo", None, &doc("Demo")).expect("create");
  let mut execution = Execution::started(id, "alice", "exec-1", json!({"email": "a@b.c"}));
  repo.create_execution(&execution).expect("create execution");

  let stored = repo.get_execution(&execution.id).expect("read").expect("exists");
  assert_eq!(stored.status, ExecutionStatus::Running);
  assert_eq!(stored.input_data, json!({"email": "a@b.c"}));
  assert!(stored.output_data.is_none());
  assert!(stored.completed_at.is_none());

  let outcome = RemoteExecution { status: ExecutionStatus::Success, data: Some(json!({"ok": 1})), error: None };
  assert!(execution.apply_remote(outcome));
  repo.update_execution(&execution).expect("update");
  let stored = repo.get_execution(&execution.id).expect("read").expect("exists");
  assert_eq!(stored.status, ExecutionStatus::Success);
  assert_eq!(stored.output_data, Some(json!({"ok": 1})));
  assert!(stored.completed_at.is_some());

  let orphan = Execution::started(Uuid::new_v4(), "alice", "exec-2", json!({}));
  assert!(matches!(repo.create_execution(&orphan), Err(FlowError::NotFound(_))));
  assert!(matches!(repo.update_execution(&orphan), Err(FlowError::NotFound(_))));

  repo.delete_workflow(&id).expect("delete");
  assert!(repo.get_execution(&execution.id).expect("read").is_none());
}

#[test]
fn service_executes_on_diesel_repository() {
  let repo = Arc::new(setup_repo());
  let automation = Arc::new(InMemoryAutomationClient::default());
  let svc = WorkflowService::new(repo.clone(), automation.clone());
  let request = NewWorkflow { name: "Demo".into(), description: None, document: doc("Demo"), change_log: None };
  let meta = svc.create_workflow("alice", request).expect("create");
  svc.deploy_workflow(meta.id, "alice", DeployOptions::default()).expect("deploy");

  let execution = svc.execute_workflow(meta.id, "alice", json!({})).expect("execute");
  let outcome = RemoteExecution { status: ExecutionStatus::Error, data: None, error: Some("timeout".into()) };
  automation.finish_execution(&execution.remote_execution_id, outcome).expect("finish");
  let done = svc.execution_status(execution.id, "alice").expect("status");
  assert_eq!(done.status, ExecutionStatus::Error);
  let stored = repo.get_execution(&execution.id).expect("read").expect("exists");
  assert_eq!(stored.error_message.as_deref(), Some("timeout"));
}
