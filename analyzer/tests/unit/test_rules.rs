//! Field recovery tests against realistic log lines

use fwu_analyzer::extract::rules::{recover, recover_for_server, rules_for, Field, Rule, Scope};
use fwu_analyzer::extract::steps::{firmware_status, install_options, sut_status};

const UUID: &str = "30313436-3631-5a43-3331-313230303432";

fn server_log() -> String {
    format!(
        "2024-03-01T10:00:00 INFO The selected baseline SPP-2023.09 is absaroka compliant = false\n\
         2024-03-01T10:00:01 INFO The selected baseline SPP-2024.03.0 is absaroka compliant = true\n\
         2024-03-01T10:00:02 INFO Successfully got SUT status from server via RIS for {u} : \
         [Mode: AutoDeployReboot Service State: Enabled Version: 4.2.0.0 Type: #HpeiSUT.v1_0_0]\n\
         2024-03-01T10:05:00 INFO Successfully got SUT status from server via RIS for {u} : \
         [Mode: AutoDeploy Service State: Disabled Version: 4.3.0.0 Type: #HpeiSUT.v1_0_0]\n\
         2024-03-01T10:06:00 INFO FirmwareDriverBaselineSettings on server enc1-bay2 {u} is \
         {{\"Mode\": \"FirmwareOnly\", \"State\": \"Activated\"}}\n",
        u = UUID
    )
}

#[test]
fn test_install_state_sentinel_never_empty() {
    let log = format!(
        "FirmwareDriverBaselineSettings on server enc1-bay2 {} is {{\"Mode\": \"FirmwareOnly\"}}\n",
        UUID
    );
    let value = recover_for_server(&log, Field::InstallState, UUID).unwrap();
    assert_eq!(value, "Unknown");
    assert!(!value.is_empty());
}

#[test]
fn test_firmware_status_from_server_log() {
    let status = firmware_status(&server_log(), UUID);
    assert_eq!(status.spp_used.as_deref(), Some("SPP-2024.03.0"));
    assert_eq!(status.install_state.as_deref(), Some("Activated"));
}

#[test]
fn test_most_recent_sut_status_wins() {
    let sut = sut_status(&server_log(), UUID);
    assert_eq!(sut.mode.as_deref(), Some("AutoDeploy"));
    assert_eq!(sut.service_state.as_deref(), Some("Disabled"));
    assert_eq!(sut.running_version.as_deref(), Some("4.3.0.0"));
}

#[test]
fn test_sut_status_of_other_server_ignored() {
    let sut = sut_status(&server_log(), "00000000-0000-0000-0000-000000000000");
    assert_eq!(sut.mode, None);
    assert_eq!(sut.service_state, None);
}

#[test]
fn test_install_options_from_payload_lines() {
    let log = "2024-03-01 Install set payload = {\"update_type\": \"Offline\", \"rewrite\": true, \"downgrade\": false}\n";
    let options = install_options(log);
    assert_eq!(options.installation_method.as_deref(), Some("Offline"));
    assert_eq!(options.force.as_deref(), Some("True"));
    assert_eq!(options.policy.as_deref(), Some("LowerThanBaseline"));
    assert_eq!(install_options("nothing useful").installation_method, None);
}

#[test]
fn test_rules_tried_in_order() {
    assert_eq!(rules_for(Field::SutMode).len(), 2);
    let rule = Rule::new(Scope::LastLine, r"count=(\d+)");
    assert_eq!(rule.apply("count=1\ncount=2\n", None).as_deref(), Some("2"));
    let rule = Rule::new(Scope::FirstLine, r"count=(\d+)");
    assert_eq!(rule.apply("count=1\ncount=2\n", None).as_deref(), Some("1"));
    assert_eq!(recover("", Field::UpdateType), None);
}
