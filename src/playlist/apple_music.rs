//! Apple Music playlist creation via AppleScript.
//!
//! Builds a script that creates a user playlist and copies each track in by
//! its persistent ID, then hands it to `osascript`. Tracks whose ID is not
//! in the local library raise a notification inside the script instead of
//! aborting it.

use super::{AutomationError, PlaylistWriter};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

pub struct AppleMusicPlaylistWriter;

impl AppleMusicPlaylistWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AppleMusicPlaylistWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn build_script(name: &str, track_ids: &[String]) -> String {
    let id_list = track_ids
        .iter()
        .map(|id| format!("\"{}\"", escape(id)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"set playlistName to "{name}"
set trackIDs to {{{id_list}}}

tell application "Music"
    set newPlaylist to make new user playlist with properties {{name:playlistName}}

    repeat with trackID in trackIDs
        try
            set theTrack to (first track of library playlist 1 whose persistent ID is trackID)
            duplicate theTrack to newPlaylist
        on error
            display notification "Track with ID " & trackID & " not found in library" with title "Track Missing"
        end try
    end repeat
end tell"#,
        name = escape(name),
        id_list = id_list,
    )
}

#[async_trait]
impl PlaylistWriter for AppleMusicPlaylistWriter {
    async fn create_playlist(
        &self,
        name: &str,
        track_ids: &[String],
    ) -> Result<(), AutomationError> {
        let script = build_script(name, track_ids);
        debug!(
            "Creating playlist \"{}\" with {} tracks",
            name,
            track_ids.len()
        );

        let output = Command::new("osascript")
            .arg("-e")
            .arg(&script)
            .output()
            .await
            .map_err(|e| AutomationError::HostUnavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AutomationError::ScriptFailed(stderr));
        }
        Ok(())
    }
}
