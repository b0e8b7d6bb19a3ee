use std::path::{Path, PathBuf};

use interaction_core::{MediaError, MediaPayload};
use mime::{APPLICATION_OCTET_STREAM, IMAGE_GIF, IMAGE_JPEG, IMAGE_PNG, Mime};
use rand::seq::SliceRandom as _;
use tokio::fs;
use tracing::debug;

/// File extensions picked up from asset directories, compared lowercased.
pub const EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "webp", "mp4", "webm"];

fn extension_allowed(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> MediaError + '_ {
    move |source| MediaError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Regular files with a media extension directly inside `directory`.
pub async fn collect_files(directory: &Path) -> Result<Vec<PathBuf>, MediaError> {
    let mut files = Vec::new();
    let mut reader = fs::read_dir(directory).await.map_err(io_error(directory))?;
    while let Some(entry) = reader.next_entry().await.map_err(io_error(directory))? {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(io_error(&path))?;
        if file_type.is_file() && extension_allowed(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

#[must_use]
pub fn guess_mime(path: &Path) -> Mime {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => IMAGE_JPEG,
        Some("png") => IMAGE_PNG,
        Some("gif") => IMAGE_GIF,
        Some("webp") => "image/webp".parse().unwrap_or(APPLICATION_OCTET_STREAM),
        Some("mp4") => "video/mp4".parse().unwrap_or(APPLICATION_OCTET_STREAM),
        Some("webm") => "video/webm".parse().unwrap_or(APPLICATION_OCTET_STREAM),
        _ => APPLICATION_OCTET_STREAM,
    }
}

/// Read one file chosen uniformly at random from `directory`.
pub async fn pick_random(directory: &Path) -> Result<MediaPayload, MediaError> {
    let candidates = collect_files(directory).await?;
    // ThreadRng is not Send; keep it out of the await points.
    let chosen = {
        let mut rng = rand::thread_rng();
        candidates.choose(&mut rng).cloned()
    };
    let Some(chosen) = chosen else {
        return Err(MediaError::EmptyDirectory {
            directory: directory.to_path_buf(),
        });
    };
    debug!(directory = %directory.display(), file = %chosen.display(), candidates = candidates.len(), "Picked local media");

    let data = fs::read(&chosen).await.map_err(io_error(&chosen))?;
    let file_name = chosen
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("media")
        .to_owned();
    Ok(MediaPayload::new(data, guess_mime(&chosen), file_name))
}
