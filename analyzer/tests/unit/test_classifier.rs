//! Outcome classifier tests

use fwu_analyzer::classify::outcome::{classify, UpdateMode};

const UUID: &str = "30313436-3631-5a43-3331-313230303432";

fn install_set_log(update_type: &str) -> String {
    format!(
        "Install set request = {{\"update_type\": \"Online\"}}\n\
         Install set request = {{\"update_type\": \"{}\", \"rewrite\": false}}\n",
        update_type
    )
}

fn failed_count_line(uuid: &str, count: u32) -> String {
    format!(
        "2024-03-01 INFO fetchFailedComponentList Total number of failed components for server name: enc1, bay 2 uuid: {} {}",
        uuid, count
    )
}

#[test]
fn test_online_activated_is_success() {
    let exec = "Updating iLO with fwInstallState: Staged\n\
                Updating iLO with fwInstallState: Activated\n";
    let outcome = classify(Some(&install_set_log("Online")), Some(exec), UUID);
    assert_eq!(outcome.mode, Some(UpdateMode::Online));
    assert!(outcome.success);
}

#[test]
fn test_online_other_final_states_fail() {
    for state in ["Failed", "InProgress"] {
        let exec = format!(
            "Updating iLO with fwInstallState: Activated\nUpdating iLO with fwInstallState: {}\n",
            state
        );
        let outcome = classify(Some(&install_set_log("Online")), Some(&exec), UUID);
        assert!(!outcome.success, "{} must not be success", state);
    }
}

#[test]
fn test_online_without_state_lines_is_failure_not_error() {
    let outcome = classify(Some(&install_set_log("online")), Some("nothing\n"), UUID);
    assert_eq!(outcome.mode, Some(UpdateMode::Online));
    assert!(!outcome.success);
    assert!(outcome.diagnostic.is_some());
}

#[test]
fn test_last_update_type_wins() {
    let exec = format!(
        "{}\nAbsaroka Firmware update is complete for server: enc1, bay 2\n",
        failed_count_line(UUID, 0)
    );
    let outcome = classify(Some(&install_set_log("OFFLINE")), Some(&exec), UUID);
    assert_eq!(outcome.mode, Some(UpdateMode::Offline));
}

#[test]
fn offline_both_markers_present_is_success_joint_predicate() {
    let exec = format!(
        "2024-03-01 INFO Starting offline update\n{}\n\
         2024-03-01 INFO Absaroka Firmware update is complete for server: enc1, bay 2\n",
        failed_count_line(UUID, 0)
    );
    let outcome = classify(Some(&install_set_log("Offline")), Some(&exec), UUID);
    assert_eq!(outcome.mode, Some(UpdateMode::Offline));
    assert!(outcome.success);
    assert!(outcome.diagnostic.is_none());
}

#[test]
fn test_offline_missing_completion_marker_fails() {
    let exec = failed_count_line(UUID, 0);
    let outcome = classify(Some(&install_set_log("Offline")), Some(&exec), UUID);
    assert!(!outcome.success);
}

#[test]
fn test_offline_count_read_per_server() {
    let exec = format!(
        "{}\n{}\nAbsaroka Firmware update is complete for server: enc1, bay 2\n",
        failed_count_line(UUID, 0),
        failed_count_line("99999999-0000-0000-0000-000000000000", 3)
    );
    let outcome = classify(Some(&install_set_log("Offline")), Some(&exec), UUID);
    assert!(outcome.success);

    let other = classify(
        Some(&install_set_log("Offline")),
        Some(&exec),
        "99999999-0000-0000-0000-000000000000",
    );
    assert!(!other.success);
}

#[test]
fn test_missing_update_type_is_terminal_failure() {
    let outcome = classify(Some("no type here"), Some(""), UUID);
    assert_eq!(outcome.mode, None);
    assert!(!outcome.success);
    assert!(outcome.diagnostic.unwrap().contains("update type"));
}

#[test]
fn test_offline_count_of_another_server_is_ignored() {
    let exec = format!(
        "{}\nAbsaroka Firmware update is complete for server: enc1, bay 4\n",
        failed_count_line("99999999-0000-0000-0000-000000000000", 0)
    );
    let outcome = classify(Some(&install_set_log("Offline")), Some(&exec), UUID);
    assert_eq!(outcome.mode, Some(UpdateMode::Offline));
    assert!(!outcome.success);
    assert_eq!(outcome.diagnostic.as_deref(), Some("no failed component count reported"));
}
