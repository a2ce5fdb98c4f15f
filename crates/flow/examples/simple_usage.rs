use flow::errors::FlowError;
use flow::stubs::InMemoryWorkflowRepository;
use flow::VersionController;
use flow::WorkflowRepository;
use std::sync::Arc;
use workflow_graph::{Connection, Node, WorkflowDocument};

fn main() -> Result<(), FlowError> {
    // Repo y controlador
    let repo = Arc::new(InMemoryWorkflowRepository::new());
    let versions = VersionController::new(repo.clone());

    let draft = WorkflowDocument::new("Welcome series").with_node(Node::new("hook", "Signup", "n8n-nodes-base.webhook", 250.0, 300.0));
    let workflow_id = repo.create_workflow("demo-user", "Welcome series", None, &draft)?;
    let v1 = versions.create_initial_version(workflow_id, draft.clone(), "demo-user")?;
    println!("created workflow {} at version {}\n", workflow_id, v1.version);

    // Añadir un nodo de email y cablearlo
    let with_mail = draft.with_node(Node::new("mail", "Send welcome", "n8n-nodes-base.emailSend", 450.0, 300.0))
                         .connect("hook", 0, Connection::main("mail", 0));
    let v2 = versions.create_next_version(workflow_id, with_mail, "demo-user", "Add welcome email")?;
    println!("version {}: {}", v2.version, v2.change_log);

    // Volver a la versión 1: se crea la versión 3 con el mismo documento
    let restored = versions.restore_version(workflow_id, 1, "demo-user")?;
    println!("version {}: {} (valid: {}, warnings: {:?})\n",
             restored.version.version, restored.version.change_log, restored.report.is_valid, restored.report.warnings);

    for v in versions.list_versions(workflow_id)? {
        println!("v{} by {} hash={} -> {}", v.version, v.created_by, &v.document_hash[..12], v.change_log);
    }
    Ok(())
}
