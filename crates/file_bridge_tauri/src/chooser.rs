//! Native dialog-backed [`ResourceChooser`].

use std::path::PathBuf;

use file_bridge_contract::{extensions_for_pattern, BridgeError, BridgeResult};
use file_bridge_core::platform::{file_uri_for_path, path_for_file_uri};
use file_bridge_core::{
    ChooserOutcome, DirectoryChooserRequest, FileChooserRequest, PlatformFuture, ResourceChooser,
};
use tauri::{AppHandle, Runtime};
use tauri_plugin_dialog::{DialogExt, FilePath};

fn filter_extensions(allowed_types: &[String]) -> Vec<&'static str> {
    let mut extensions: Vec<&'static str> = allowed_types
        .iter()
        .flat_map(|pattern| extensions_for_pattern(pattern))
        .collect();
    extensions.sort_unstable();
    extensions.dedup();
    extensions
}

fn start_path(start_directory: &str) -> PathBuf {
    path_for_file_uri(start_directory).unwrap_or_else(|_| PathBuf::from(start_directory))
}

fn selected_uri(selected: FilePath) -> BridgeResult<String> {
    let path = selected
        .into_path()
        .map_err(|err| BridgeError::io_failure(format!("chooser returned no local path: {err}")))?;
    file_uri_for_path(&path)
}

/// Chooser that presents the OS file and folder dialogs.
pub struct DialogChooser<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> DialogChooser<R> {
    /// Creates a chooser bound to `app`'s dialog plugin.
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

impl<R: Runtime> ResourceChooser for DialogChooser<R> {
    fn choose_files<'a>(
        &'a self,
        request: &'a FileChooserRequest,
    ) -> PlatformFuture<'a, BridgeResult<ChooserOutcome<Vec<String>>>> {
        Box::pin(async move {
            let mut dialog = self.app.dialog().file();
            let extensions = filter_extensions(&request.allowed_types);
            if !extensions.is_empty() {
                dialog = dialog.add_filter("Allowed files", &extensions);
            }
            let allow_multiple = request.allow_multiple;
            let picked = tauri::async_runtime::spawn_blocking(move || {
                if allow_multiple {
                    dialog.blocking_pick_files()
                } else {
                    dialog.blocking_pick_file().map(|selected| vec![selected])
                }
            })
            .await
            .map_err(|err| BridgeError::io_failure(format!("file chooser failed: {err}")))?;

            match picked {
                Some(selected) => selected
                    .into_iter()
                    .map(selected_uri)
                    .collect::<BridgeResult<Vec<_>>>()
                    .map(ChooserOutcome::Selected),
                None => Ok(ChooserOutcome::Cancelled),
            }
        })
    }

    fn choose_directory<'a>(
        &'a self,
        request: &'a DirectoryChooserRequest,
    ) -> PlatformFuture<'a, BridgeResult<ChooserOutcome<String>>> {
        Box::pin(async move {
            let mut dialog = self.app.dialog().file();
            if let Some(start) = request.start_directory.as_deref() {
                dialog = dialog.set_directory(start_path(start));
            }
            let picked = tauri::async_runtime::spawn_blocking(move || dialog.blocking_pick_folder())
                .await
                .map_err(|err| BridgeError::io_failure(format!("folder chooser failed: {err}")))?;

            match picked {
                Some(selected) => selected_uri(selected).map(ChooserOutcome::Selected),
                None => Ok(ChooserOutcome::Cancelled),
            }
        })
    }
}
