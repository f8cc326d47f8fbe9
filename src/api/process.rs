use super::{AppState, Json};
use crate::{
    error::Result,
    models::Tag,
    services::process_bridge::CreatedProcess,
};
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct CreateProcessRequest {
    pub address: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
pub struct CreateProcessResponse {
    pub process: CreatedProcess,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryProcessRequest {
    pub process_id: String,
    pub query: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunProcessRequest {
    pub process_id: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct GetProcessesRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessesResponse {
    pub processes: Value,
}

#[derive(Debug, Deserialize)]
pub struct SaveChatRequest {
    pub payload: Value,
}

#[derive(Debug, Serialize)]
pub struct ResultResponse<T: Serialize> {
    pub result: T,
}

/// POST /createProcess
pub async fn create_process(
    State(state): State<AppState>,
    Json(req): Json<CreateProcessRequest>,
) -> Result<Json<CreateProcessResponse>> {
    let process = state.processes.create_process(&req.address, req.tags).await?;
    Ok(Json(CreateProcessResponse { process }))
}

/// POST /queryProcess
pub async fn query_process(
    State(state): State<AppState>,
    Json(req): Json<QueryProcessRequest>,
) -> Result<Json<ResultResponse<String>>> {
    let result = state
        .processes
        .query_process(&req.process_id, &req.query)
        .await?;
    Ok(Json(ResultResponse { result }))
}

/// POST /runProcess
pub async fn run_process(
    State(state): State<AppState>,
    Json(req): Json<RunProcessRequest>,
) -> Result<Json<ResultResponse<String>>> {
    let result = state
        .processes
        .run_process(&req.process_id, &req.code)
        .await?;
    Ok(Json(ResultResponse { result }))
}

/// POST /getProcesses
pub async fn get_processes(
    State(state): State<AppState>,
    Json(req): Json<GetProcessesRequest>,
) -> Result<Json<ProcessesResponse>> {
    let processes = state.processes.user_processes(&req.address).await?;
    Ok(Json(ProcessesResponse { processes }))
}

/// POST /save-chat
pub async fn save_chat(
    State(state): State<AppState>,
    Json(req): Json<SaveChatRequest>,
) -> Result<Json<ResultResponse<Value>>> {
    let result = state.processes.save_chat(req.payload).await?;
    Ok(Json(ResultResponse { result }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::harness;
    use serde_json::json;

    #[tokio::test]
    async fn create_process_wraps_id_and_name() {
        let h = harness();
        let req: CreateProcessRequest = serde_json::from_value(json!({
            "address": "0xowner",
            "tags": [{"name": "Name", "value": "agent"}],
        }))
        .expect("request");

        let Json(response) = create_process(State(h.state), Json(req)).await.expect("create");
        let body = serde_json::to_value(&response).expect("json");
        assert_eq!(body["process"]["name"], "agent");
        assert!(body["process"]["processId"].is_string());
        assert_eq!(h.bus.spawned().len(), 1);
    }

    #[tokio::test]
    async fn get_processes_defaults_to_empty_list() {
        let h = harness();
        h.bus
            .set_output(&h.state.config.ao_registry_process, r#"{"0xsomeone": ["p"]}"#);
        let Json(response) = get_processes(
            State(h.state.clone()),
            Json(GetProcessesRequest {
                address: "0xowner".to_string(),
            }),
        )
        .await
        .expect("processes");
        assert_eq!(response.processes, json!([]));
    }

    #[tokio::test]
    async fn run_process_returns_message_id() {
        let h = harness();
        let Json(response) = run_process(
            State(h.state),
            Json(RunProcessRequest {
                process_id: "proc".to_string(),
                code: "Send({Target = ao.id})".to_string(),
            }),
        )
        .await
        .expect("run");
        assert_eq!(response.result, "message-0");
    }
}
