use colod_core::{CommandSlot, MockHandle, StatusReport};
use colod_hv::HvCommand;
use colod_types::{ColodError, OrchestratorState, RuntimeFlags};
use serde_json::json;

use crate::handle_request;

#[tokio::test]
async fn query_status_reports_state_and_flags() {
    let mut mock = MockHandle::new();
    mock.expect_query_status().returning(|| {
        Ok(StatusReport::new(
            OrchestratorState::PrimaryColoRunning,
            RuntimeFlags::new(true),
        ))
    });

    let reply = handle_request(&mock, r#"{"exec-colod": "query-status"}"#).await;

    assert_eq!(reply["return"]["state"], "primary-colo-running");
    assert_eq!(reply["return"]["primary"], true);
}

#[tokio::test]
async fn set_store_then_query_store_round_trips_through_the_handle() {
    let mut mock = MockHandle::new();
    mock.expect_set_store()
        .withf(|store| store == &json!({"epoch": 3}))
        .returning(|_| Ok(()));
    mock.expect_query_store().returning(|| Ok(json!({"epoch": 3})));

    let set_reply = handle_request(&mock, r#"{"exec-colod": "set-store", "store": {"epoch": 3}}"#).await;
    assert_eq!(set_reply, json!({"return": {}}));

    let query_reply = handle_request(&mock, r#"{"exec-colod": "query-store"}"#).await;
    assert_eq!(query_reply, json!({"return": {"epoch": 3}}));
}

#[tokio::test]
async fn set_migration_start_forwards_the_command_array_unchanged() {
    let mut mock = MockHandle::new();
    mock.expect_set_commands()
        .withf(|slot, commands| {
            *slot == CommandSlot::MigrationStart && commands == &vec![json!({"execute": "migrate-set-capabilities"})]
        })
        .returning(|_, _| Ok(()));

    let reply = handle_request(
        &mock,
        r#"{"exec-colod": "set-migration-start", "commands": [{"execute": "migrate-set-capabilities"}]}"#,
    )
    .await;

    assert_eq!(reply, json!({"return": {}}));
}

#[tokio::test]
async fn set_peer_query_peer_and_clear_peer_round_trip() {
    let mut mock = MockHandle::new();
    mock.expect_set_peer()
        .withf(|peer| peer == "node-b")
        .returning(|_| Ok(()));
    mock.expect_query_peer().returning(|| Ok("node-b".to_owned()));
    mock.expect_clear_peer().returning(|| Ok(()));

    assert_eq!(
        handle_request(&mock, r#"{"exec-colod": "set-peer", "peer": "node-b"}"#).await,
        json!({"return": {}})
    );
    assert_eq!(
        handle_request(&mock, r#"{"exec-colod": "query-peer"}"#).await,
        json!({"return": "node-b"})
    );
    assert_eq!(
        handle_request(&mock, r#"{"exec-colod": "clear-peer"}"#).await,
        json!({"return": {}})
    );
}

#[tokio::test]
async fn unrecognised_exec_colod_falls_back_to_passthrough() {
    let mut mock = MockHandle::new();
    mock.expect_passthrough()
        .withf(|command: &HvCommand| command.execute == "query-migrate")
        .returning(|_| Ok(json!({"status": "completed"})));

    let reply = handle_request(&mock, r#"{"execute": "query-migrate"}"#).await;

    assert_eq!(reply, json!({"return": {"status": "completed"}}));
}

#[tokio::test]
async fn passthrough_forwards_arguments_when_present() {
    let mut mock = MockHandle::new();
    mock.expect_passthrough()
        .withf(|command: &HvCommand| {
            command.execute == "migrate_set_parameters" && command.arguments == Some(json!({"max-bandwidth": 1}))
        })
        .returning(|_| Ok(json!({})));

    let reply = handle_request(
        &mock,
        r#"{"execute": "migrate_set_parameters", "arguments": {"max-bandwidth": 1}}"#,
    )
    .await;

    assert_eq!(reply, json!({"return": {}}));
}

#[tokio::test]
async fn hypervisor_command_errors_surface_as_error_replies() {
    let mut mock = MockHandle::new();
    mock.expect_yank()
        .returning(|| Err(colod_core::Error::Command(ColodError::HypervisorCommand("yank already pending".into()))));

    let reply = handle_request(&mock, r#"{"exec-colod": "yank"}"#).await;

    assert_eq!(reply["error"]["class"], "GenericError");
    assert!(reply["error"]["desc"].as_str().unwrap().contains("yank already pending"));
}

#[tokio::test]
async fn malformed_json_is_reported_without_panicking() {
    let mock = MockHandle::new();

    let reply = handle_request(&mock, "not json").await;

    assert_eq!(reply["error"]["class"], "GenericError");
}
