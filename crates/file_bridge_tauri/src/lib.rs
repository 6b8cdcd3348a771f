//! Tauri plugin hosting the native file-access bridge on desktop.
//!
//! Registers the bridge operations as `plugin:file-bridge|<operation>` commands. The bridge uses
//! the security-scoped bookmark model ([`file_bridge_core::DesktopPlatform`]) with the dialog
//! plugin as chooser, keeps application storage under the app data dir, and restores persisted
//! grants during setup. An optional `file-bridge.toml` in the app config dir overrides the
//! storage layout.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

mod chooser;
pub mod commands;

use std::sync::Arc;

use file_bridge_contract::{BridgeError, BridgeResult};
use file_bridge_core::{BridgeConfig, DesktopPlatform, FileBridge};
use tauri::plugin::{Builder, TauriPlugin};
use tauri::{AppHandle, Manager, Runtime};
use tracing::info;

pub use chooser::DialogChooser;

const CONFIG_FILE: &str = "file-bridge.toml";

fn load_config<R: Runtime>(app: &AppHandle<R>) -> BridgeResult<BridgeConfig> {
    let override_path = app
        .path()
        .app_config_dir()
        .map(|dir| dir.join(CONFIG_FILE))
        .ok()
        .filter(|path| path.exists());
    if let Some(path) = override_path {
        info!(path = %path.display(), "loading file bridge config");
        return BridgeConfig::load(path);
    }
    let root = app
        .path()
        .app_data_dir()
        .map_err(|err| BridgeError::io_failure(format!("failed to resolve app data dir: {err}")))?
        .join("file-bridge");
    Ok(BridgeConfig::under(root))
}

/// Builds the plugin. Requires `tauri_plugin_dialog::init()` to be registered as well.
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("file-bridge")
        .invoke_handler(tauri::generate_handler![
            commands::pick_file,
            commands::pick_directory,
            commands::read_content,
            commands::copy_to_local,
            commands::write_content,
            commands::write_directory_entry,
            commands::release_access,
            commands::list_grants,
            commands::dispatch
        ])
        .setup(|app, _api| {
            let config = load_config(app)?;
            let bridge = FileBridge::new(
                config,
                Arc::new(DesktopPlatform::new()),
                Arc::new(DialogChooser::new(app.clone())),
            )?;
            let restored = tauri::async_runtime::block_on(bridge.restore_persisted_grants());
            info!(restored, "file bridge ready");
            app.manage(bridge);
            Ok(())
        })
        .build()
}
