// Esquema Diesel compartido por SQLite y Postgres.
// Tablas: workflows (puntero al documento actual), workflow_versions
// (historial inmutable), executions (ejecuciones lanzadas en el motor). Los timestamps se guardan en microsegundos UTC.
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    workflows (id) {
        id -> Text,
        owner_id -> Text,
        name -> Text,
        description -> Nullable<Text>,
        status -> Text,
        document -> Text,
        current_version -> BigInt,
        remote_id -> Nullable<Text>,
        is_deployed -> Bool,
        created_at_ts -> BigInt,
        updated_at_ts -> BigInt,
    }
}
diesel::table! {
    workflow_versions (id) {
        id -> Text,
        workflow_id -> Text,
        version -> BigInt,
        document -> Text,
        document_hash -> Text,
        change_log -> Text,
        created_by -> Text,
        created_at_ts -> BigInt,
    }
}
diesel::table! {
    executions (id) {
        id -> Text,
        workflow_id -> Text,
        owner_id -> Text,
        status -> Text,
        remote_execution_id -> Text,
        input_data -> Text,
        output_data -> Nullable<Text>,
        error_message -> Nullable<Text>,
        started_at_ts -> BigInt,
        completed_at_ts -> Nullable<BigInt>,
    }
}
allow_tables_to_appear_in_same_query!(workflows, workflow_versions, executions);
