//! Desktop background setter
//!
//! Shells out to the platform's own tooling. Callers only learn whether it
//! worked; what the desktop does with the image is out of our hands.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("setting the desktop background is not supported on {0}")]
    Unsupported(String),

    #[error("image file {path:?} is not accessible: {source}")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed {
        program: &'static str,
        status: ExitStatus,
    },
}

/// Something that can put an image on the desktop
#[async_trait]
pub trait BackgroundSetter: Send + Sync {
    async fn set_desktop_background(&self, image_path: &Path) -> Result<(), BackgroundError>;
}

/// One external command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundCommand {
    pub program: &'static str,
    pub args: Vec<String>,
    /// Failure of this command does not fail the whole operation
    pub optional: bool,
}

/// Commands that set `image_path` as the background on `os`
/// (values of [`std::env::consts::OS`]).
pub fn background_commands(
    os: &str,
    image_path: &Path,
) -> Result<Vec<BackgroundCommand>, BackgroundError> {
    let path = image_path.display().to_string();

    match os {
        "linux" => {
            let uri = format!("file://{path}");
            Ok(vec![
                BackgroundCommand {
                    program: "gsettings",
                    args: vec![
                        "set".into(),
                        "org.gnome.desktop.background".into(),
                        "picture-uri".into(),
                        uri.clone(),
                    ],
                    optional: false,
                },
                // GNOME 42+ keeps a separate key for the dark style
                BackgroundCommand {
                    program: "gsettings",
                    args: vec![
                        "set".into(),
                        "org.gnome.desktop.background".into(),
                        "picture-uri-dark".into(),
                        uri,
                    ],
                    optional: true,
                },
            ])
        }
        "macos" => Ok(vec![BackgroundCommand {
            program: "osascript",
            args: vec![
                "-e".into(),
                format!(
                    "tell application \"Finder\" to set desktop picture to POSIX file \"{}\"",
                    path.replace('"', "\\\"")
                ),
            ],
            optional: false,
        }]),
        "windows" => {
            // SPI_SETDESKWALLPAPER = 20, SPIF_UPDATEINIFILE | SPIF_SENDCHANGE = 3
            let script = format!(
                "Add-Type -TypeDefinition 'using System.Runtime.InteropServices; \
                 public class Wallpaper {{ [DllImport(\"user32.dll\", CharSet = CharSet.Unicode)] \
                 public static extern bool SystemParametersInfo(int a, int b, string c, int d); }}'; \
                 if (-not [Wallpaper]::SystemParametersInfo(20, 0, '{}', 3)) {{ exit 1 }}",
                path.replace('\'', "''")
            );
            Ok(vec![BackgroundCommand {
                program: "powershell",
                args: vec!["-NoProfile".into(), "-NonInteractive".into(), "-Command".into(), script],
                optional: false,
            }])
        }
        other => Err(BackgroundError::Unsupported(other.to_string())),
    }
}

/// Sets the background of the desktop this process runs on
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBackground;

#[async_trait]
impl BackgroundSetter for SystemBackground {
    async fn set_desktop_background(&self, image_path: &Path) -> Result<(), BackgroundError> {
        let absolute = tokio::fs::canonicalize(image_path).await.map_err(|source| {
            BackgroundError::MissingFile {
                path: image_path.to_path_buf(),
                source,
            }
        })?;

        for command in background_commands(env::consts::OS, &absolute)? {
            debug!(program = command.program, args = ?command.args, "Running background command");
            let result = Command::new(command.program)
                .args(&command.args)
                .status()
                .await;

            match result {
                Ok(status) if status.success() => {}
                Ok(status) if command.optional => {
                    debug!(program = command.program, %status, "Optional background command failed");
                }
                Ok(status) => {
                    return Err(BackgroundError::Failed {
                        program: command.program,
                        status,
                    });
                }
                Err(e) if command.optional => {
                    debug!(program = command.program, error = %e, "Optional background command failed");
                }
                Err(source) => {
                    return Err(BackgroundError::Spawn {
                        program: command.program,
                        source,
                    });
                }
            }
        }

        info!(path = %absolute.display(), "Desktop background updated");
        Ok(())
    }
}
