//! Decodes one `exec-colod` request line into an [`OrchestratorHandle`] call and
//! encodes its result back into a hypervisor-shaped reply (`{"return": ...}` or
//! `{"error": {...}}`), mirroring the wire conventions `colod-hv::wire` already uses for
//! the hypervisor's own protocol so a management client and a hypervisor client can
//! share one mental model.
use colod_core::{CommandSlot, Error as HandleError, OrchestratorHandle};
use colod_hv::HvCommand;
use colod_types::ColodError;
use serde_json::{json, Value};

/// Handles one decoded request line, returning the line to write back to the client.
pub async fn handle_request(handle: &impl OrchestratorHandle, line: &str) -> Value {
    let request: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => return error_reply(format!("invalid JSON: {err}")),
    };

    let result = dispatch(handle, &request).await;
    match result {
        Ok(value) => json!({ "return": value }),
        Err(err) => error_reply(err.to_string()),
    }
}

fn error_reply(desc: String) -> Value {
    json!({ "error": { "class": "GenericError", "desc": desc } })
}

async fn dispatch(handle: &impl OrchestratorHandle, request: &Value) -> Result<Value, HandleError> {
    let Some(command) = request.get("exec-colod").and_then(Value::as_str) else {
        return passthrough(handle, request).await;
    };

    match command {
        "query-status" => Ok(serde_json::to_value(handle.query_status().await?).unwrap_or(Value::Null)),
        "query-store" => handle.query_store().await,
        "set-store" => {
            let store = request.get("store").cloned().unwrap_or(Value::Null);
            handle.set_store(store).await?;
            Ok(Value::Object(Default::default()))
        }
        "quit" => {
            handle.quit().await?;
            Ok(Value::Object(Default::default()))
        }
        "autoquit" => {
            handle.autoquit().await?;
            Ok(Value::Object(Default::default()))
        }
        "start-migration" => {
            handle.start_migration().await?;
            Ok(Value::Object(Default::default()))
        }
        "set-migration-start" => set_commands(handle, request, CommandSlot::MigrationStart).await,
        "set-migration-switchover" => set_commands(handle, request, CommandSlot::MigrationSwitchover).await,
        "set-primary-failover" => set_commands(handle, request, CommandSlot::PrimaryFailover).await,
        "set-secondary-failover" => set_commands(handle, request, CommandSlot::SecondaryFailover).await,
        "set-yank" => {
            let instances = command_array(request, "instances");
            handle.set_yank(instances).await?;
            Ok(Value::Object(Default::default()))
        }
        "yank" => {
            handle.yank().await?;
            Ok(Value::Object(Default::default()))
        }
        "stop" => handle.stop().await,
        "cont" => handle.cont().await,
        "set-peer" => {
            let peer = request.get("peer").and_then(Value::as_str).unwrap_or_default();
            handle.set_peer(peer.to_owned()).await?;
            Ok(Value::Object(Default::default()))
        }
        "query-peer" => Ok(Value::String(handle.query_peer().await?)),
        "clear-peer" => {
            handle.clear_peer().await?;
            Ok(Value::Object(Default::default()))
        }
        // Any `exec-colod` value we don't recognise is still routed as a passthrough,
        // exactly like a request with no `exec-colod` field at all.
        _ => passthrough(handle, request).await,
    }
}

fn command_array(request: &Value, field: &str) -> Vec<Value> {
    request
        .get(field)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

async fn set_commands(handle: &impl OrchestratorHandle, request: &Value, slot: CommandSlot) -> Result<Value, HandleError> {
    handle.set_commands(slot, command_array(request, "commands")).await?;
    Ok(Value::Object(Default::default()))
}

async fn passthrough(handle: &impl OrchestratorHandle, request: &Value) -> Result<Value, HandleError> {
    let Some(execute) = request.get("execute").and_then(Value::as_str) else {
        return Err(HandleError::Command(ColodError::Protocol(
            "request is neither a recognised exec-colod command nor a hypervisor command".into(),
        )));
    };

    let command = match request.get("arguments").cloned() {
        Some(arguments) => HvCommand::with_arguments(execute, arguments),
        None => HvCommand::new(execute),
    };

    handle.passthrough(command).await
}
