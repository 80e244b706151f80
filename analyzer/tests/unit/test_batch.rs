//! End-to-end batch tests over fixture bundles

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fwu_analyzer::app::options::BatchOptions;
use fwu_analyzer::app::run::{audit_file_name, run};
use fwu_analyzer::classify::outcome::UpdateMode;
use fwu_analyzer::errors::AnalyzerError;
use fwu_analyzer::filesys::dir::Dir;
use fwu_analyzer::models::record::AnalysisRecord;
use fwu_analyzer::persist::file::FileRecordStore;
use fwu_analyzer::persist::store::{RecordStore, RetryPolicy, StoreAck};
use fwu_analyzer::storage::layout::BundleLayout;
use serde_json::Value;

const SERVER_A: &str = "30313436-3631-5a43-3331-313230303432";
const SERVER_B: &str = "37393150-3336-5a43-3239-303530423533";
const SERVER_C: &str = "38383838-3838-5a43-3838-383838383838";

async fn write_bundle(root: &Dir) {
    let layout = BundleLayout::new(root.path());
    layout.version_file().write_string("8.60.01-0512345\n").await.unwrap();
    layout
        .properties_file()
        .write_string("APPLIANCE_NAME=composer\nMODEL_NUMBER = Synergy Composer2\n")
        .await
        .unwrap();

    let mut install_set = String::from(
        "2024-03-01 10:00:00 INFO Request = {\"hapi\": {\"HostOS\": {\"OsName\": \"RHEL\", \"OsVersion\": \"9.2\"}, \
         \"server_inventory\": {\"fw_inventory\": [{\"Id\": \"2\", \"Name\": \"System ROM\"}, {\"Id\": \"1\", \"Name\": \"iLO 6\"}]}}}\n",
    );
    for uuid in [SERVER_A, SERVER_B] {
        install_set.push_str(&format!(
            "2024-03-01 10:01:00 INFO Install set request for {} = {{\"update_type\": \"Online\", \"rewrite\": false, \"downgrade\": true}}\n\
             2024-03-01 10:02:00 INFO Install set response for {} = {{\"hapi\": {{\"install_set\": {{\"Name\": \"SPP-2024.03.0\"}}, \"dependency_failures\": []}}}}\n",
            uuid, uuid
        ));
    }
    layout.install_set_log().write_string(&install_set).await.unwrap();

    layout
        .execution_log()
        .write_string(
            "2024-03-01 10:10:00 INFO Updating iLO with fwInstallState: Staged\n\
             2024-03-01 10:20:00 INFO Updating iLO with fwInstallState: Activated\n",
        )
        .await
        .unwrap();

    layout
        .server_log(SERVER_A)
        .write_string(&format!(
            "The selected baseline SPP-2024.03.0 is absaroka compliant = true\n\
             Successfully got SUT status from server via RIS for {u} : [Mode: AutoDeploy Service State: Enabled Version: 4.3.0.0 Type: #HpeiSUT]\n\
             FirmwareDriverBaselineSettings on server enc1-bay2 {u} is {{\"State\": \"Completed\"}}\n",
            u = SERVER_A
        ))
        .await
        .unwrap();
    layout
        .server_dir(SERVER_A)
        .subdir("component")
        .file("DependencyFailure.json")
        .write_string(
            r#"{"install_set": {"Name": "SPP-2024.03.0", "Description": "NIC dependency"},
                "sequence_details": [{"PackageVersion": "22.41", "Filename": "cp056789.exe",
                "DeviceClass": "nic", "InstalledVersion": [{"Version": "22.36", "Target": "guid-1"}]}]}"#,
        )
        .await
        .unwrap();

    layout
        .server_fallback_log(SERVER_B)
        .write_string(&format!(
            "Successfully got SUT status from server via RIS for {} : [Mode: OnDemand Service State: Disabled Version: 4.1.0.0 Type: #HpeiSUT]\n",
            SERVER_B
        ))
        .await
        .unwrap();
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    }
}

#[tokio::test]
async fn test_batch_end_to_end() {
    let root = Dir::create_temp_dir("fwu-batch").await.unwrap();
    write_bundle(&root).await;

    let records = root.subdir("records");
    let store: Arc<dyn RecordStore> = Arc::new(FileRecordStore::new(records.clone()));
    let mut options = BatchOptions::new(root.path());
    options.batch_id = "machine-a".to_string();
    options.max_parallel_servers = 2;

    let summary = run(options, Some(store)).await.unwrap();
    assert_eq!(summary.servers.len(), 2);
    assert!(summary.all_persisted());
    assert_eq!(summary.servers[0].uuid, SERVER_A);
    assert!(summary.servers.iter().all(|s| s.update_succeeded));
    assert!(summary.servers.iter().all(|s| s.mode == Some(UpdateMode::Online)));

    let a: AnalysisRecord = records.file(&format!("{}.json", SERVER_A)).read_json().await.unwrap();
    assert_eq!(a.one_view.version, "8.60.01-0512345");
    assert_eq!(a.one_view.model, "Synergy Composer2");
    assert_eq!(a.server.uuid, SERVER_A);
    assert_eq!(a.server.os, "RHEL");
    assert_eq!(a.server.ilo_model, "iLO 6");
    assert_eq!(a.server.generation, "Gen11");
    assert_eq!(a.server.sut_mode, "AutoDeploy");
    assert_eq!(a.firmware_update.sut_mode, "AutoDeploy");
    assert_eq!(a.firmware_update.spp_used, "SPP-2024.03.0");
    assert_eq!(a.firmware_update.install_state, "Completed");
    assert_eq!(a.firmware_update.installation_method, "Online");
    assert_eq!(a.firmware_update.force, "False");
    assert_eq!(a.firmware_update.policy, "Exact Match");
    assert_eq!(a.install_set_response.retry, "No");
    assert_eq!(a.install_set_response.sum_version, "sum service");
    assert_eq!(a.install_set_response.dependency, "NIC dependency");
    assert_eq!(a.components.len(), 1);
    assert_eq!(a.components[0].installed_version, "22.36");

    let b: AnalysisRecord = records.file(&format!("{}.json", SERVER_B)).read_json().await.unwrap();
    assert_eq!(b.server.sut_mode, "OnDemand");
    assert_eq!(b.firmware_update.sut_running_version, "4.1.0.0");
    assert!(b.firmware_update.spp_used.is_empty());
    assert!(b.firmware_update.install_state.is_empty());
    assert_eq!(b.install_set_response.dependency, "None");
    assert!(b.components.is_empty());

    let audit: Value = BundleLayout::new(root.path())
        .analysis_dir()
        .file(&audit_file_name("machine-a", SERVER_B))
        .read_json()
        .await
        .unwrap();
    assert_eq!(audit["record"]["Server"]["UUID"], SERVER_B);
    assert_eq!(audit["outcome"]["success"], true);
    assert!(audit["diagnostics"].is_array());

    root.delete().await.unwrap();
}

/// Adds a server whose install-set response and dependency document do not decode
async fn add_broken_server(root: &Dir) {
    let layout = BundleLayout::new(root.path());
    let mut install_set = layout.install_set_log().read_string().await.unwrap();
    install_set.push_str(&format!(
        "2024-03-01 10:03:00 INFO Install set request for {u} = {{\"update_type\": \"Online\", \"rewrite\": false, \"downgrade\": true}}\n\
         2024-03-01 10:04:00 INFO Install set response for {u} = {{\"hapi\": }}\n",
        u = SERVER_C
    ));
    layout.install_set_log().write_string(&install_set).await.unwrap();

    layout
        .server_log(SERVER_C)
        .write_string(&format!(
            "Successfully got SUT status from server via RIS for {} : [Mode: AutoStage Service State: Enabled Version: 4.2.0.0 Type: #HpeiSUT]\n",
            SERVER_C
        ))
        .await
        .unwrap();
    layout
        .server_dir(SERVER_C)
        .file("DependencyFailure.json")
        .write_string("{\"install_set\": {\"Name\": ")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_malformed_payloads_stay_local() {
    let root = Dir::create_temp_dir("fwu-batch").await.unwrap();
    write_bundle(&root).await;
    add_broken_server(&root).await;

    let records = root.subdir("records");
    let store: Arc<dyn RecordStore> = Arc::new(FileRecordStore::new(records.clone()));
    let mut options = BatchOptions::new(root.path());
    options.batch_id = "machine-b".to_string();

    let summary = run(options, Some(store)).await.unwrap();
    assert_eq!(summary.servers.len(), 3);
    assert!(summary.all_persisted());

    let c: AnalysisRecord = records.file(&format!("{}.json", SERVER_C)).read_json().await.unwrap();
    assert!(c.install_set_response.spp.is_empty());
    assert!(c.install_set_response.retry.is_empty());
    assert!(c.components.is_empty());
    assert_eq!(c.server.os, "RHEL");
    assert_eq!(c.server.generation, "Gen11");
    assert_eq!(c.server.sut_mode, "AutoStage");
    assert_eq!(c.firmware_update.installation_method, "Online");
    assert_eq!(c.one_view.version, "8.60.01-0512345");

    // The neighbouring servers still decode their own responses
    let a: AnalysisRecord = records.file(&format!("{}.json", SERVER_A)).read_json().await.unwrap();
    assert_eq!(a.install_set_response.spp, "SPP-2024.03.0");

    let audit: Value = BundleLayout::new(root.path())
        .analysis_dir()
        .file(&audit_file_name("machine-b", SERVER_C))
        .read_json()
        .await
        .unwrap();
    let diagnostics = audit["diagnostics"].as_array().unwrap();
    for step in ["install_set_response", "components"] {
        assert!(
            diagnostics
                .iter()
                .any(|d| d["step"] == step && d["kind"] == "malformed_payload"),
            "no malformed_payload diagnostic for {}: {:?}",
            step,
            diagnostics
        );
    }

    root.delete().await.unwrap();
}

struct UnavailableStore {
    calls: AtomicU32,
}

#[async_trait]
impl RecordStore for UnavailableStore {
    async fn store(&self, _record: &AnalysisRecord) -> Result<StoreAck, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AnalyzerError::StoreUnavailable("503 Service Unavailable".to_string()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

#[tokio::test]
async fn test_persistence_failure_does_not_abort_batch() {
    let root = Dir::create_temp_dir("fwu-batch").await.unwrap();
    write_bundle(&root).await;

    let store = Arc::new(UnavailableStore {
        calls: AtomicU32::new(0),
    });
    let mut options = BatchOptions::new(root.path());
    options.retry = fast_retry();

    let summary = run(options, Some(store.clone() as Arc<dyn RecordStore>)).await.unwrap();
    assert_eq!(summary.servers.len(), 2);
    assert!(!summary.all_persisted());
    assert_eq!(store.calls.load(Ordering::SeqCst), 6);
    for server in &summary.servers {
        assert!(!server.persisted);
        assert!(server.error.as_deref().unwrap().contains("Persistence failure"));
        assert!(server.update_succeeded);
    }

    root.delete().await.unwrap();
}

#[tokio::test]
async fn test_batch_without_server_logs_is_empty() {
    let root = Dir::create_temp_dir("fwu-batch").await.unwrap();
    let mut options = BatchOptions::new(root.path());
    options.audit.enabled = false;

    let summary = run(options, None).await.unwrap();
    assert!(summary.servers.is_empty());
    assert!(summary.all_persisted());
    assert!(summary.finished_at >= summary.started_at);

    root.delete().await.unwrap();
}

#[test]
fn test_missing_batch_dir_is_fatal() {
    let options = BatchOptions::new("/nonexistent/fwu-analyzer/batch");
    let err = tokio_test::block_on(run(options, None)).unwrap_err();
    assert!(matches!(err, AnalyzerError::MissingInput(_)));
}
