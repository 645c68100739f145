use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSuffix {
    Png,
    Jpg,
    Webp,
    Mp4,
    Mp3,
}

impl OutputSuffix {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
            Self::Mp4 => "mp4",
            Self::Mp3 => "mp3",
        }
    }

    pub fn from_image_format(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpg,
            "webp" => Self::Webp,
            _ => Self::Png,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub filename: String,
    pub path: PathBuf,
}

/// Fresh `<uuid>.<suffix>` name; never reuses an existing file.
pub fn new_output_file(output_dir: &Path, suffix: OutputSuffix) -> OutputFile {
    let filename = format!("{}.{}", Uuid::new_v4().simple(), suffix.as_str());
    OutputFile {
        path: output_dir.join(filename.as_str()),
        filename,
    }
}

pub async fn write_output(
    output_dir: &Path,
    suffix: OutputSuffix,
    bytes: &[u8],
) -> Result<OutputFile, GenerationError> {
    if bytes.is_empty() {
        return Err(GenerationError::backend(
            "output",
            format!("refusing to write empty .{} payload", suffix.as_str()),
        ));
    }
    tokio::fs::create_dir_all(output_dir).await?;
    let file = new_output_file(output_dir, suffix);
    tokio::fs::write(file.path.as_path(), bytes).await?;
    Ok(file)
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|v| v.to_str())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_output_dir() -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!("assetsmith_pathing_{stamp}"))
    }

    #[test]
    fn output_names_are_unique_and_suffixed() {
        let dir = PathBuf::from("/tmp/out");
        let a = new_output_file(dir.as_path(), OutputSuffix::Png);
        let b = new_output_file(dir.as_path(), OutputSuffix::Png);

        assert_ne!(a.filename, b.filename);
        assert!(a.filename.ends_with(".png"));
        assert_eq!(a.path, dir.join(a.filename.as_str()));
    }

    #[tokio::test]
    async fn writes_payload_and_creates_directory() {
        let dir = temp_output_dir();
        let file = write_output(dir.as_path(), OutputSuffix::Mp3, b"ID3")
            .await
            .expect("write should succeed");

        assert_eq!(std::fs::read(file.path.as_path()).expect("file exists"), b"ID3");
        assert_eq!(mime_for_path(file.path.as_path()), "audio/mpeg");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn rejects_empty_payloads() {
        let dir = temp_output_dir();
        let err = write_output(dir.as_path(), OutputSuffix::Mp4, &[])
            .await
            .expect_err("empty payload should fail");
        assert!(matches!(err, GenerationError::Backend { .. }));
    }
}
