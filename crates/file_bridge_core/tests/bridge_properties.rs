use std::fs;
use std::sync::Arc;
use std::thread;

use file_bridge_contract::{
    dispatch_json, encode_payload, BridgeErrorKind, CopyToLocalRequest, FileBridgeService,
    GrantScope, LocalDestination, PickDirectoryOptions, PickFileOptions, ReadContentRequest,
    ReleaseAccessRequest, WriteContentRequest, WriteDirectoryEntryRequest,
};
use file_bridge_core::{
    BridgeConfig, FileBridge, MemoryPlatform, PlatformProvider, ScriptedChooser,
};
use futures::executor::block_on;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

struct Harness {
    dir: TempDir,
    platform: Arc<MemoryPlatform>,
    chooser: Arc<ScriptedChooser>,
    bridge: FileBridge,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let platform = Arc::new(MemoryPlatform::new());
        platform.add_file("content://docs/notes", "notes.txt", "text/plain", b"hello");
        platform.add_virtual_file(
            "content://docs/sheet",
            "Budget",
            "application/vnd.google-apps.spreadsheet",
            &[("application/pdf", b"%PDF-1.7 budget")],
        );
        platform.add_directory("content://tree/out", "out");
        let chooser = Arc::new(ScriptedChooser::new());
        let bridge = Self::bridge_for(&dir, &platform, &chooser);
        Self {
            dir,
            platform,
            chooser,
            bridge,
        }
    }

    fn bridge_for(
        dir: &TempDir,
        platform: &Arc<MemoryPlatform>,
        chooser: &Arc<ScriptedChooser>,
    ) -> FileBridge {
        FileBridge::new(
            BridgeConfig::under(dir.path()),
            platform.clone() as Arc<dyn PlatformProvider>,
            chooser.clone(),
        )
        .expect("bridge")
    }

    fn open(&self, uri: &str, long_term: bool) {
        self.chooser.push_files([uri]);
        let picked = block_on(self.bridge.pick_file(PickFileOptions {
            request_long_term_access: long_term,
            allow_virtual_files: true,
            ..PickFileOptions::default()
        }))
        .expect("pick");
        assert_eq!(picked.len(), 1, "pick of {uri}");
    }

    fn read(&self, uri: &str, convert: Option<&str>) -> Result<Vec<u8>, BridgeErrorKind> {
        block_on(self.bridge.read_content(ReadContentRequest {
            uri: uri.to_string(),
            convert_virtual_as_type: convert.map(str::to_string),
        }))
        .map(|payload| payload.decode().expect("payload decodes"))
        .map_err(|err| err.kind)
    }
}

#[test]
fn short_term_picks_carry_no_bookmark() {
    let harness = Harness::new();
    harness.chooser.push_files(["content://docs/notes"]);
    let picked = block_on(harness.bridge.pick_file(PickFileOptions::default())).expect("pick");

    assert_eq!(picked[0].bookmark, None);
    assert_eq!(picked[0].mime_type, "text/plain");
    assert_eq!(picked[0].size, 5);
    assert!(block_on(harness.bridge.list_grants()).is_empty());

    harness.open("content://docs/notes", true);
    harness.chooser.push_files(["content://docs/notes"]);
    let again = block_on(harness.bridge.pick_file(PickFileOptions::default())).expect("re-pick");
    assert_eq!(again[0].bookmark, None);

    harness.chooser.push_directory("content://tree/out");
    let dir = block_on(harness.bridge.pick_directory(PickDirectoryOptions::default()))
        .expect("pick dir");
    assert_eq!(dir.bookmark, None);
}

#[test]
fn write_then_read_round_trips_exact_bytes() {
    let harness = Harness::new();
    harness.open("content://docs/notes", false);
    let bytes: Vec<u8> = (0..=255).collect();

    block_on(harness.bridge.write_content(WriteContentRequest {
        uri: "content://docs/notes".to_string(),
        data: encode_payload(&bytes),
        mime_type: None,
    }))
    .expect("write");
    assert_eq!(harness.read("content://docs/notes", None), Ok(bytes));
    assert_eq!(harness.platform.active_scopes(), 0);
}

#[test]
fn repeated_release_never_fails() {
    let harness = Harness::new();
    harness.open("content://docs/notes", true);
    assert_eq!(harness.platform.persisted_count(), 1);
    let request = ReleaseAccessRequest {
        uris: vec!["content://docs/notes".to_string(), "content://docs/none".to_string()],
    };

    let first = block_on(harness.bridge.release_access(request.clone()));
    let second = block_on(harness.bridge.release_access(request));
    assert_eq!(first.released_count, 1);
    assert_eq!(second.released_count, 0);
    assert_eq!(harness.platform.persisted_count(), 0);

    let err = harness
        .read("content://docs/notes", None)
        .expect_err("released grant");
    assert_eq!(err, BridgeErrorKind::PermissionDenied);
}

#[test]
fn repeated_copy_keeps_one_file_with_latest_content() {
    let harness = Harness::new();
    harness.open("content://docs/notes", false);
    let request = CopyToLocalRequest {
        uri: "content://docs/notes".to_string(),
        destination: LocalDestination::Documents,
        filename: Some("snapshot.txt".to_string()),
        convert_virtual_as_type: None,
    };

    block_on(harness.bridge.copy_to_local(request.clone())).expect("first copy");
    harness
        .platform
        .add_file("content://docs/notes", "notes.txt", "text/plain", b"updated");
    let result = block_on(harness.bridge.copy_to_local(request)).expect("second copy");

    assert_eq!(result.name, "snapshot.txt");
    assert_eq!(result.size, 7);
    assert_eq!(fs::read(&result.path).expect("copy"), b"updated");
    let documents = harness.bridge.config().documents_dir.clone();
    let names: Vec<String> = fs::read_dir(documents)
        .expect("list")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["snapshot.txt".to_string()]);
}

#[test]
fn virtual_reads_require_an_advertised_target() {
    let harness = Harness::new();
    harness.open("content://docs/sheet", false);

    assert_eq!(
        harness.read("content://docs/sheet", None),
        Err(BridgeErrorKind::ConversionUnsupported)
    );
    assert_eq!(
        harness.read("content://docs/sheet", Some("text/csv")),
        Err(BridgeErrorKind::ConversionUnsupported)
    );
    assert_eq!(
        harness.read("content://docs/sheet", Some("application/pdf")),
        Ok(b"%PDF-1.7 budget".to_vec())
    );

    let copy = block_on(harness.bridge.copy_to_local(CopyToLocalRequest {
        uri: "content://docs/sheet".to_string(),
        destination: LocalDestination::Cache,
        filename: None,
        convert_virtual_as_type: Some("application/pdf".to_string()),
    }))
    .expect("converted copy");
    assert_eq!(copy.name, "Budget.pdf");
    assert_eq!(copy.mime_type, "application/pdf");
}

#[test]
fn directory_entries_take_their_mime_from_the_name() {
    let harness = Harness::new();
    harness.chooser.push_directory("content://tree/out");
    block_on(harness.bridge.pick_directory(PickDirectoryOptions::default())).expect("pick dir");

    for (name, expected) in [
        (
            "report.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        ("data.unknownext", "application/octet-stream"),
    ] {
        let written = block_on(harness.bridge.write_directory_entry(WriteDirectoryEntryRequest {
            directory_uri: "content://tree/out".to_string(),
            filename: name.to_string(),
            data: encode_payload(b"body"),
        }))
        .expect("write entry");
        assert_eq!(written.mime_type, expected);
        assert_eq!(
            harness.read(&written.uri, None),
            Ok(b"body".to_vec()),
            "children are covered by the directory grant"
        );
    }
}

#[test]
fn cancelled_multi_pick_returns_an_empty_list() {
    let harness = Harness::new();
    harness.chooser.push_cancel();
    let picked = block_on(harness.bridge.pick_file(PickFileOptions {
        allow_multiple: true,
        ..PickFileOptions::default()
    }))
    .expect("cancel is not a failure");
    assert!(picked.is_empty());

    let err = block_on(harness.bridge.pick_directory(PickDirectoryOptions::default()))
        .expect_err("cancelled directory pick");
    assert_eq!(err.kind, BridgeErrorKind::Cancelled);
    assert_eq!(err.operation.as_deref(), Some("pick_directory"));
}

#[test]
fn out_of_band_revocation_is_seen_on_next_access() {
    let harness = Harness::new();
    harness.open("content://docs/notes", false);
    assert!(harness.read("content://docs/notes", None).is_ok());

    harness.platform.revoke("content://docs/notes");
    assert_eq!(
        harness.read("content://docs/notes", None),
        Err(BridgeErrorKind::PermissionDenied)
    );
    harness.platform.remove("content://docs/notes");
    assert_eq!(
        harness.read("content://docs/notes", None),
        Err(BridgeErrorKind::PermissionDenied)
    );
}

#[test]
fn concurrent_release_counts_each_grant_once() {
    let harness = Harness::new();
    harness.open("content://docs/notes", true);
    let request = ReleaseAccessRequest {
        uris: vec!["content://docs/notes".to_string()],
    };

    let total: usize = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let request = request.clone();
                let bridge = &harness.bridge;
                scope.spawn(move || block_on(bridge.release_access(request)).released_count)
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("release thread"))
            .sum()
    });
    assert_eq!(total, 1);
    assert!(harness.bridge.grants().is_empty());
}

#[test]
fn reads_racing_a_release_see_either_state() {
    let harness = Harness::new();
    harness.open("content://docs/notes", true);
    let release = ReleaseAccessRequest {
        uris: vec!["content://docs/notes".to_string()],
    };

    let (reads, released) = thread::scope(|scope| {
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let harness = &harness;
                scope.spawn(move || {
                    (0..16)
                        .map(|_| harness.read("content://docs/notes", None))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let bridge = &harness.bridge;
        let releaser = scope.spawn(move || block_on(bridge.release_access(release)));
        let reads: Vec<_> = readers
            .into_iter()
            .flat_map(|reader| reader.join().expect("reader thread"))
            .collect();
        (reads, releaser.join().expect("release thread"))
    });

    assert_eq!(released.released_count, 1);
    for read in reads {
        match read {
            Ok(bytes) => assert_eq!(bytes, b"hello"),
            Err(kind) => assert_eq!(kind, BridgeErrorKind::PermissionDenied),
        }
    }
    assert!(harness.bridge.grants().is_empty());
    assert!(block_on(harness.bridge.list_grants()).is_empty());
    assert_eq!(harness.platform.persisted_count(), 0);
    assert_eq!(harness.platform.active_scopes(), 0);
}

#[test]
fn persisted_grants_survive_a_new_session() {
    let harness = Harness::new();
    harness.open("content://docs/notes", true);
    harness.chooser.push_directory("content://tree/out");
    block_on(harness.bridge.pick_directory(PickDirectoryOptions {
        request_long_term_access: true,
        ..PickDirectoryOptions::default()
    }))
    .expect("pick dir");

    let next = Harness::bridge_for(&harness.dir, &harness.platform, &harness.chooser);
    assert!(next.grants().is_empty());
    assert_eq!(block_on(next.restore_persisted_grants()), 2);

    let grants = block_on(next.list_grants());
    let listed: Vec<(&str, GrantScope)> = grants
        .iter()
        .map(|grant| (grant.identifier.as_str(), grant.scope))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("content://docs/notes", GrantScope::File),
            ("content://tree/out", GrantScope::Directory),
        ]
    );
    assert!(block_on(next.read_content(ReadContentRequest {
        uri: "content://docs/notes".to_string(),
        convert_virtual_as_type: None,
    }))
    .is_ok());
}

#[test]
fn json_envelope_drives_the_bridge() {
    let harness = Harness::new();
    harness.open("content://docs/notes", false);

    let raw = json!({"op": "read_content", "args": {"uri": "content://docs/notes"}}).to_string();
    let response: Value =
        serde_json::from_str(&block_on(dispatch_json(&harness.bridge, &raw))).expect("json");
    assert_eq!(
        response,
        json!({
            "status": "ok",
            "value": {"data": encode_payload(b"hello"), "mimeType": "text/plain", "size": 5}
        })
    );

    let raw = json!({"op": "read_content", "args": {"uri": "content://docs/sheet"}}).to_string();
    let response: Value =
        serde_json::from_str(&block_on(dispatch_json(&harness.bridge, &raw))).expect("json");
    assert_eq!(response["status"], "error");
    assert_eq!(response["error"]["kind"], "PermissionDenied");
    assert_eq!(response["error"]["target"], "content://docs/sheet");
}
