// Archivo: api.rs
// Propósito: envelopes JSON `{success, data}` / `{success: false, error}`
// para la capa HTTP (que vive fuera de este crate).
use crate::errors::{FlowError, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn err(error: &FlowError) -> Self {
        Self { success: false,
               data: None,
               error: Some(ApiErrorBody { code: error.code().to_string(), message: error.message().to_string() }) }
    }

    /// Convierte un resultado del servicio en `(status HTTP, envelope)`.
    /// Las validaciones son consultas: un reporte inválido sigue siendo 200.
    pub fn respond(result: Result<T>) -> (u16, Self) {
        match result {
            Ok(data) => (200, Self::ok(data)),
            Err(e) => (e.http_status(), Self::err(&e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelopes_serialize_like_the_api() {
        let (status, body) = ApiEnvelope::respond(Ok(json!({"id": 1})));
        assert_eq!(status, 200);
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"success": true, "data": {"id": 1}}));

        let (status, body) = ApiEnvelope::<()>::respond(Err(FlowError::Conflict("busy".into())));
        assert_eq!(status, 409);
        assert_eq!(serde_json::to_value(&body).unwrap(),
                   json!({"success": false, "error": {"code": "CONFLICT", "message": "busy"}}));

        let (status, _) = ApiEnvelope::<()>::respond(Err(FlowError::NotFound("x".into())));
        assert_eq!(status, 404);
    }
}
