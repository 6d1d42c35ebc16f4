//! Write-then-replace file persistence
//!
//! Content goes to a uniquely named sibling temp file which is then renamed
//! over the target. Readers see either the old or the new document, never a
//! partial one; on failure the temp file is removed and the target is untouched.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

fn temp_path_for(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    parent.join(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

/// Atomically replace `path` with `content`
pub async fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let temp_path = temp_path_for(path);

    let result = async {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp_path).await;
    }
    result
}
