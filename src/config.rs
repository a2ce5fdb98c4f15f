//! Configuración del binario leída del entorno.
use flow::errors::FlowError;

pub const DEFAULT_AUTOMATION_BASE_URL: &str = "http://localhost:5678";
pub const DEFAULT_ACTOR: &str = "cli";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base del motor de automatización; se usa para construir las URLs de
    /// los workflows desplegados.
    pub automation_base_url: String,
    /// Usuario con el que la CLI crea y edita workflows.
    pub actor: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, FlowError> {
        dotenvy::dotenv().ok();
        let automation_base_url = non_empty_var("AUTOMATION_BASE_URL").unwrap_or_else(|| DEFAULT_AUTOMATION_BASE_URL.into());
        if !(automation_base_url.starts_with("http://") || automation_base_url.starts_with("https://")) {
            return Err(FlowError::Validation(format!("AUTOMATION_BASE_URL no es una URL http: {}", automation_base_url)));
        }
        let actor = non_empty_var("FLOW_ACTOR").unwrap_or_else(|| DEFAULT_ACTOR.into());
        Ok(Self { automation_base_url, actor })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
