use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::models::Category;
use crate::storage::FileStorage;

pub const MAX_FILE_BYTES: u64 = 100 * 1024 * 1024;
pub const MAX_BULK_FILES: usize = 10;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm", "mkv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a"];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "csv",
];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar"];

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("file {name} exceeds the upload limit of {limit} bytes")]
    TooLarge { name: String, limit: u64 },
    #[error("too many files: limit is {limit} per upload")]
    TooManyFiles { limit: usize },
    #[error("invalid file name: {0}")]
    InvalidName(String),
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// One file as it arrived in a multipart request.
pub struct IncomingFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Descriptor handed back once bytes are validated and persisted.
pub struct StoredFile {
    pub stored_path: String,
    pub byte_size: u64,
}

/// Validation front for uploads: enforces the extension allow-list, the
/// per-file size cap and the bulk count cap, then persists bytes under a
/// timestamp-prefixed sanitized name.
#[derive(Clone)]
pub struct FileIntake {
    storage: Arc<dyn FileStorage>,
}

impl FileIntake {
    pub fn new(storage: Arc<dyn FileStorage>) -> Self {
        Self { storage }
    }

    pub async fn intake(&self, file: IncomingFile) -> Result<StoredFile, IntakeError> {
        validate(&file)?;
        self.persist(file).await
    }

    /// Bulk variant: every file is validated before any byte is persisted,
    /// so a rejected file leaves no partial state behind.
    pub async fn intake_many(
        &self,
        files: Vec<IncomingFile>,
    ) -> Result<Vec<StoredFile>, IntakeError> {
        if files.len() > MAX_BULK_FILES {
            return Err(IntakeError::TooManyFiles {
                limit: MAX_BULK_FILES,
            });
        }
        for file in &files {
            validate(file)?;
        }
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            stored.push(self.persist(file).await?);
        }
        Ok(stored)
    }

    async fn persist(&self, file: IncomingFile) -> Result<StoredFile, IntakeError> {
        let sanitized = sanitize_name(&file.name)?;
        let stored_name = self.unique_name(&sanitized).await;
        let byte_size = file.bytes.len() as u64;
        self.storage.save(&stored_name, file.bytes).await?;
        Ok(StoredFile {
            stored_path: stored_name,
            byte_size,
        })
    }

    async fn unique_name(&self, sanitized: &str) -> String {
        let millis = Utc::now().timestamp_millis();
        let mut candidate = format!("{millis}_{sanitized}");
        let mut attempt = 1u32;
        while self.storage.exists(&candidate).await {
            candidate = format!("{millis}_{attempt}_{sanitized}");
            attempt += 1;
        }
        candidate
    }
}

fn validate(file: &IncomingFile) -> Result<(), IntakeError> {
    sanitize_name(&file.name)?;
    let ext = extension_of(&file.name)
        .ok_or_else(|| IntakeError::UnsupportedType(file.name.clone()))?;
    if !is_allowed_extension(&ext) {
        return Err(IntakeError::UnsupportedType(ext));
    }
    if file.bytes.len() as u64 > MAX_FILE_BYTES {
        return Err(IntakeError::TooLarge {
            name: file.name.clone(),
            limit: MAX_FILE_BYTES,
        });
    }
    Ok(())
}

/// Declared names that smell of path traversal are rejected outright;
/// everything else is reduced to a safe flat file name.
fn sanitize_name(declared: &str) -> Result<String, IntakeError> {
    let trimmed = declared.trim();
    if trimmed.is_empty()
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains("..")
    {
        return Err(IntakeError::InvalidName(declared.to_string()));
    }
    let cleaned: String = trimmed
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_' | ' ') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    Ok(cleaned.replace(' ', "_"))
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_allowed_extension(ext: &str) -> bool {
    [
        IMAGE_EXTENSIONS,
        VIDEO_EXTENSIONS,
        AUDIO_EXTENSIONS,
        DOCUMENT_EXTENSIONS,
        ARCHIVE_EXTENSIONS,
    ]
    .iter()
    .any(|group| group.contains(&ext))
}

/// Default category for a declared file name, by extension group.
pub fn category_for(name: &str) -> Category {
    match extension_of(name) {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => Category::Images,
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => Category::Videos,
        Some(ext) if AUDIO_EXTENSIONS.contains(&ext.as_str()) => Category::Audio,
        Some(ext) if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) => Category::Documents,
        _ => Category::Other,
    }
}

/// Human-readable size string for a byte count, trailing zeros trimmed.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DiskStorage;

    fn intake_on(dir: &tempfile::TempDir) -> FileIntake {
        FileIntake::new(Arc::new(DiskStorage::new(dir.path())))
    }

    fn file(name: &str, bytes: &[u8]) -> IncomingFile {
        IncomingFile {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn human_size_trims_trailing_zeros() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1024), "1 KB");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(2_516_582), "2.4 MB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn sanitize_rejects_traversal() {
        assert!(matches!(
            sanitize_name("../../etc/passwd"),
            Err(IntakeError::InvalidName(_))
        ));
        assert!(matches!(
            sanitize_name("reports\\q1.pdf"),
            Err(IntakeError::InvalidName(_))
        ));
        assert!(matches!(
            sanitize_name("   "),
            Err(IntakeError::InvalidName(_))
        ));
    }

    #[test]
    fn sanitize_flattens_odd_characters() {
        assert_eq!(sanitize_name("weekly report.pdf").unwrap(), "weekly_report.pdf");
        assert_eq!(sanitize_name("notes:v2.txt").unwrap(), "notes_v2.txt");
    }

    #[test]
    fn categories_follow_extension_groups() {
        assert_eq!(category_for("map.png"), Category::Images);
        assert_eq!(category_for("clip.MP4"), Category::Videos);
        assert_eq!(category_for("alert.wav"), Category::Audio);
        assert_eq!(category_for("plan.docx"), Category::Documents);
        assert_eq!(category_for("bundle.zip"), Category::Other);
    }

    #[tokio::test]
    async fn rejects_disallowed_extension_before_write() {
        let dir = tempfile::tempdir().unwrap();
        let intake = intake_on(&dir);

        let result = intake.intake(file("payload.exe", b"MZ")).await;
        assert!(matches!(result, Err(IntakeError::UnsupportedType(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let intake = intake_on(&dir);

        let big = IncomingFile {
            name: "huge.pdf".to_string(),
            bytes: vec![0u8; (MAX_FILE_BYTES + 1) as usize],
        };
        let result = intake.intake(big).await;
        assert!(matches!(result, Err(IntakeError::TooLarge { .. })));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn bulk_caps_file_count() {
        let dir = tempfile::tempdir().unwrap();
        let intake = intake_on(&dir);

        let files: Vec<IncomingFile> = (0..MAX_BULK_FILES + 1)
            .map(|i| file(&format!("doc{i}.txt"), b"x"))
            .collect();
        let result = intake.intake_many(files).await;
        assert!(matches!(result, Err(IntakeError::TooManyFiles { .. })));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn duplicate_names_get_distinct_stored_paths() {
        let dir = tempfile::tempdir().unwrap();
        let intake = intake_on(&dir);

        let first = intake.intake(file("notes.txt", b"one")).await.unwrap();
        let second = intake.intake(file("notes.txt", b"two")).await.unwrap();
        assert_ne!(first.stored_path, second.stored_path);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn stored_path_reports_byte_size() {
        let dir = tempfile::tempdir().unwrap();
        let intake = intake_on(&dir);

        let stored = intake.intake(file("brief.pdf", b"hello")).await.unwrap();
        assert_eq!(stored.byte_size, 5);
        assert!(stored.stored_path.ends_with("brief.pdf"));
        assert!(dir.path().join(&stored.stored_path).exists());
    }
}
