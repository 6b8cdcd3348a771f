use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use file_bridge_contract::{
    encode_payload, BridgeErrorKind, CopyToLocalRequest, FileBridgeService, LocalDestination,
    PickDirectoryOptions, PickFileOptions, PickMode, ReadContentRequest, WriteContentRequest,
    WriteDirectoryEntryRequest,
};
use file_bridge_core::platform::file_uri_for_path;
use file_bridge_core::{
    BridgeConfig, DesktopPlatform, FileBridge, PlatformProvider, ScriptedChooser,
};
use futures::executor::block_on;
use tempfile::TempDir;

struct Desktop {
    app_dir: TempDir,
    user_dir: TempDir,
    platform: Arc<DesktopPlatform>,
    chooser: Arc<ScriptedChooser>,
    bridge: FileBridge,
}

impl Desktop {
    fn new() -> Self {
        let app_dir = TempDir::new().expect("app dir");
        let user_dir = TempDir::new().expect("user dir");
        let platform = Arc::new(DesktopPlatform::new());
        let chooser = Arc::new(ScriptedChooser::new());
        let bridge = Self::session(&app_dir, &platform, &chooser);
        Self {
            app_dir,
            user_dir,
            platform,
            chooser,
            bridge,
        }
    }

    fn session(
        app_dir: &TempDir,
        platform: &Arc<DesktopPlatform>,
        chooser: &Arc<ScriptedChooser>,
    ) -> FileBridge {
        FileBridge::new(
            BridgeConfig::under(app_dir.path()),
            platform.clone() as Arc<dyn PlatformProvider>,
            chooser.clone(),
        )
        .expect("bridge")
    }

    fn user_path(&self, relative: &str) -> PathBuf {
        fs::canonicalize(self.user_dir.path())
            .expect("canonical user dir")
            .join(relative)
    }
}

fn uri(path: &Path) -> String {
    file_uri_for_path(path).expect("file uri")
}

#[test]
fn open_pick_reads_and_writes_in_place() {
    let desktop = Desktop::new();
    let path = desktop.user_path("notes.md");
    fs::write(&path, "# draft").expect("seed");
    desktop.chooser.push_files([uri(&path)]);

    let picked = block_on(desktop.bridge.pick_file(PickFileOptions {
        request_long_term_access: true,
        ..PickFileOptions::default()
    }))
    .expect("pick");
    assert_eq!(picked[0].mime_type, "text/markdown");
    assert_eq!(picked[0].path, path.display().to_string());
    assert!(picked[0].bookmark.is_some());

    block_on(desktop.bridge.write_content(WriteContentRequest {
        uri: picked[0].uri.clone(),
        data: encode_payload(b"# final"),
        mime_type: Some("text/markdown".to_string()),
    }))
    .expect("write");
    assert_eq!(fs::read_to_string(&path).expect("read back"), "# final");

    let payload = block_on(desktop.bridge.read_content(ReadContentRequest {
        uri: picked[0].uri.clone(),
        convert_virtual_as_type: Some("application/pdf".to_string()),
    }))
    .expect("direct files ignore conversion targets");
    assert_eq!(payload.decode().expect("decode"), b"# final");
    assert_eq!(payload.mime_type, "text/markdown");
    assert_eq!(desktop.platform.active_scopes(), 0);
}

#[test]
fn import_pick_is_independent_of_the_source() {
    let desktop = Desktop::new();
    let path = desktop.user_path("photo.png");
    fs::write(&path, [0x89, b'P', b'N', b'G']).expect("seed");
    desktop.chooser.push_files([uri(&path)]);

    let picked = block_on(desktop.bridge.pick_file(PickFileOptions {
        mode: PickMode::Import,
        allowed_types: vec!["image/*".to_string()],
        ..PickFileOptions::default()
    }))
    .expect("import");
    fs::remove_file(&path).expect("remove source");

    let imported = &picked[0];
    assert_ne!(imported.uri, uri(&path));
    assert_eq!(imported.bookmark, None);
    let payload = block_on(desktop.bridge.read_content(ReadContentRequest {
        uri: imported.uri.clone(),
        convert_virtual_as_type: None,
    }))
    .expect("imported copy reads without a grant");
    assert_eq!(payload.size, 4);
    assert_eq!(payload.mime_type, "image/png");
}

#[test]
fn directory_grant_covers_new_entries() {
    let desktop = Desktop::new();
    let out = desktop.user_path("exports");
    fs::create_dir(&out).expect("mkdir");
    desktop.chooser.push_directory(uri(&out));

    let dir = block_on(desktop.bridge.pick_directory(PickDirectoryOptions::default()))
        .expect("pick dir");
    assert_eq!(dir.name, "exports");
    assert_eq!(dir.bookmark, None);

    for body in [&b"v1"[..], &b"second version"[..]] {
        let written = block_on(desktop.bridge.write_directory_entry(WriteDirectoryEntryRequest {
            directory_uri: dir.uri.clone(),
            filename: "summary.csv".to_string(),
            data: encode_payload(body),
        }))
        .expect("write entry");
        assert_eq!(written.mime_type, "text/csv");
        assert_eq!(fs::read(out.join("summary.csv")).expect("entry"), body);
    }
    let entries = fs::read_dir(&out).expect("list").count();
    assert_eq!(entries, 1);

    let copy = block_on(desktop.bridge.copy_to_local(CopyToLocalRequest {
        uri: uri(&out.join("summary.csv")),
        destination: LocalDestination::Documents,
        filename: None,
        convert_virtual_as_type: None,
    }))
    .expect("copy child of granted directory");
    assert_eq!(copy.name, "summary.csv");
    assert!(Path::new(&copy.path).starts_with(&desktop.bridge.config().documents_dir));
}

#[test]
fn paths_outside_any_grant_are_denied() {
    let desktop = Desktop::new();
    let path = desktop.user_path("secret.txt");
    fs::write(&path, "secret").expect("seed");

    let err = block_on(desktop.bridge.read_content(ReadContentRequest {
        uri: uri(&path),
        convert_virtual_as_type: None,
    }))
    .expect_err("no grant");
    assert_eq!(err.kind, BridgeErrorKind::PermissionDenied);
}

#[cfg(unix)]
#[test]
fn symlinks_cannot_widen_a_directory_grant() {
    use std::os::unix::fs::symlink;

    let desktop = Desktop::new();
    let granted = desktop.user_path("granted");
    fs::create_dir(&granted).expect("mkdir");
    let elsewhere = TempDir::new().expect("outside dir");
    fs::write(elsewhere.path().join("secret.txt"), "outside").expect("seed outside");
    symlink(elsewhere.path(), granted.join("link")).expect("symlink");
    desktop.chooser.push_directory(uri(&granted));
    block_on(desktop.bridge.pick_directory(PickDirectoryOptions::default())).expect("pick dir");

    let err = block_on(desktop.bridge.read_content(ReadContentRequest {
        uri: uri(&granted.join("link/secret.txt")),
        convert_virtual_as_type: None,
    }))
    .expect_err("read through symlink");
    assert_eq!(err.kind, BridgeErrorKind::PermissionDenied);

    let err = block_on(desktop.bridge.write_content(WriteContentRequest {
        uri: uri(&granted.join("link/secret.txt")),
        data: encode_payload(b"overwritten"),
        mime_type: None,
    }))
    .expect_err("write through symlink");
    assert_eq!(err.kind, BridgeErrorKind::PermissionDenied);
    assert_eq!(
        fs::read_to_string(elsewhere.path().join("secret.txt")).expect("outside intact"),
        "outside"
    );
}

#[test]
fn bookmarks_restore_until_the_file_disappears() {
    let desktop = Desktop::new();
    let keep = desktop.user_path("keep.txt");
    let gone = desktop.user_path("gone.txt");
    fs::write(&keep, "keep").expect("seed");
    fs::write(&gone, "gone").expect("seed");
    desktop.chooser.push_files([uri(&keep), uri(&gone)]);
    let picked = block_on(desktop.bridge.pick_file(PickFileOptions {
        allow_multiple: true,
        request_long_term_access: true,
        ..PickFileOptions::default()
    }))
    .expect("pick");
    assert_eq!(picked.len(), 2);
    fs::remove_file(&gone).expect("remove");

    let next = Desktop::session(&desktop.app_dir, &desktop.platform, &desktop.chooser);
    assert_eq!(block_on(next.restore_persisted_grants()), 1);
    let grants = block_on(next.list_grants());
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].identifier, uri(&keep));
}
