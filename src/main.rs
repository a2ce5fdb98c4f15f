use flow::domain::{DeployOptions, ListOptions, NewWorkflow};
use flow::stubs::InMemoryAutomationClient;
use flow::WorkflowService;
use flow_persistence::DieselWorkflowRepository;
use log::info;
use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use uuid::Uuid;
use workflow_graph::{ValidationReport, WorkflowDocument};

mod config;

type Service = WorkflowService<DieselWorkflowRepository, InMemoryAutomationClient>;

/// Pequeño menú interactivo para administrar workflows usando el
/// repositorio proporcionado por `flow-persistence`.
///
/// Opciones soportadas:
/// 1) Ver workflows
/// 2) Crear workflow desde un archivo JSON
/// 3) Validar workflow
/// 4) Ver historial de versiones
/// 5) Restaurar una versión
/// 6) Desplegar workflow
/// 7) Eliminar workflow
/// 8) Salir
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env()
                                                  .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
                             .init();

    let app = config::AppConfig::from_env()?;
    // Inicializar repo (aplica migraciones embebidas si procede)
    let repo = Arc::new(flow_persistence::new_from_env()?);
    let automation = Arc::new(InMemoryAutomationClient::new(app.automation_base_url.clone()));
    let service: Service = WorkflowService::new(repo, automation);
    info!("main-core ready (actor: {})", app.actor);

    loop {
        println!("\n== Workflow CLI menu ==");
        println!("1) Ver workflows");
        println!("2) Crear workflow desde archivo JSON");
        println!("3) Validar workflow");
        println!("4) Ver historial de versiones");
        println!("5) Restaurar versión");
        println!("6) Desplegar workflow");
        println!("7) Eliminar workflow");
        println!("8) Salir");
        print!("Elige una opción: ");
        io::stdout().flush().ok();

        let mut choice = String::new();
        if io::stdin().read_line(&mut choice)? == 0 {
            break;
        }
        match choice.trim() {
            "1" => match service.list_workflows(&app.actor, &ListOptions { page_size: 100, ..Default::default() }) {
                Ok(page) => {
                    println!("\nID                                   | VER | STATUS   | NAME");
                    println!("-----------------------------------------------------------------------------------");
                    for w in &page.items {
                        println!("{} | {:>3} | {:<8} | {}", w.id, w.current_version, w.status, w.name);
                    }
                    println!("({} de {})", page.items.len(), page.total);
                }
                Err(e) => eprintln!("Error listando workflows: {}", e),
            },
            "2" => {
                let path = prompt("Ruta del archivo JSON: ")?;
                let text = match std::fs::read_to_string(path.trim()) {
                    Ok(t) => t,
                    Err(e) => {
                        eprintln!("No se pudo leer el archivo: {}", e);
                        continue;
                    }
                };
                let document = match WorkflowDocument::parse_str(&text) {
                    Ok(d) => d,
                    Err(e) => {
                        eprintln!("Documento inválido: {}", e);
                        continue;
                    }
                };
                let default_name = document.name.clone().unwrap_or_default();
                let name = prompt(&format!("Nombre (enter para '{}'): ", default_name))?;
                let name = if name.trim().is_empty() { default_name } else { name.trim().to_string() };
                let description = prompt("Descripción (enter para vacío): ")?;
                let description = if description.trim().is_empty() { None } else { Some(description.trim().to_string()) };
                let request = NewWorkflow { name, description, document, change_log: None };
                match service.create_workflow(&app.actor, request) {
                    Ok(meta) => {
                        println!("Workflow creado: {} (versión {})", meta.id, meta.current_version);
                        if let Ok(report) = service.validate_workflow(meta.id, &app.actor) {
                            print_report(&report);
                        }
                    }
                    Err(e) => eprintln!("Error creando workflow: {}", e),
                }
            }
            "3" => {
                let Some(id) = prompt_uuid("Workflow id (UUID): ")? else { continue };
                match service.validate_workflow(id, &app.actor) {
                    Ok(report) => print_report(&report),
                    Err(e) => eprintln!("Error validando: {}", e),
                }
            }
            "4" => {
                let Some(id) = prompt_uuid("Workflow id (UUID): ")? else { continue };
                match service.version_history(id, &app.actor) {
                    Ok(versions) => {
                        for v in versions {
                            println!("v{:<4} {} {:<10} {}",
                                     v.version,
                                     v.created_at.format("%Y-%m-%d %H:%M:%S"),
                                     v.created_by,
                                     v.change_log);
                        }
                    }
                    Err(e) => eprintln!("Error leyendo historial: {}", e),
                }
            }
            "5" => {
                let Some(id) = prompt_uuid("Workflow id (UUID): ")? else { continue };
                let version_s = prompt("Versión a restaurar (número entero): ")?;
                let target: i64 = match version_s.trim().parse() {
                    Ok(n) => n,
                    Err(_) => {
                        eprintln!("Versión inválida");
                        continue;
                    }
                };
                match service.restore_version(id, &app.actor, target) {
                    Ok(outcome) => {
                        println!("Restaurado como versión {}", outcome.version.version);
                        print_report(&outcome.report);
                    }
                    Err(e) => eprintln!("Error restaurando: {}", e),
                }
            }
            "6" => {
                let Some(id) = prompt_uuid("Workflow id (UUID): ")? else { continue };
                let activate = prompt("¿Activar tras desplegar? (s/N): ")?;
                let options = DeployOptions { activate: matches!(activate.trim().to_lowercase().as_str(), "s" | "si" | "y" | "yes") };
                match service.deploy_workflow(id, &app.actor, options) {
                    Ok(d) => println!("Desplegado como {} {}", d.remote_id, d.deployed_url),
                    Err(e) => eprintln!("Error desplegando [{}]: {}", e.code(), e),
                }
            }
            "7" => {
                let Some(id) = prompt_uuid("Workflow id a eliminar (UUID): ")? else { continue };
                let confirm = prompt(&format!("Confirma borrado de {}? escribir 'yes' para confirmar: ", id))?;
                if confirm.trim().to_lowercase() == "yes" {
                    match service.delete_workflow(id, &app.actor) {
                        Ok(()) => println!("Workflow eliminado: {}", id),
                        Err(e) => eprintln!("Error eliminando workflow: {}", e),
                    }
                } else {
                    println!("Borrado cancelado");
                }
            }
            "8" | "q" | "quit" | "exit" => break,
            other => println!("Opción no reconocida: {}", other),
        }
    }

    Ok(())
}

fn print_report(report: &ValidationReport) {
    println!("Válido: {}", report.is_valid);
    for e in &report.errors {
        println!("  error: {}", e);
    }
    for w in &report.warnings {
        println!("  aviso: {}", w);
    }
    for n in report.invalid_nodes() {
        println!("  nodo {}: {}", n.id.as_deref().unwrap_or("?"), n.errors.join(", "));
    }
    for c in report.invalid_connections() {
        println!("  conexión {} -> {}: {}", c.from, c.to.as_deref().unwrap_or("?"), c.errors.join(", "));
    }
}

fn prompt(msg: &str) -> Result<String, Box<dyn Error>> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}

fn prompt_uuid(msg: &str) -> Result<Option<Uuid>, Box<dyn Error>> {
    let raw = prompt(msg)?;
    match Uuid::parse_str(raw.trim()) {
        Ok(u) => Ok(Some(u)),
        Err(_) => {
            eprintln!("UUID inválido");
            Ok(None)
        }
    }
}
