// ============================================================================
// SERVICE : STOCKAGE DES FICHIERS
// ============================================================================
//
// Description:
//   Écrit les fichiers uploadés (reçus en base64) sous un nom aléatoire
//   dans le dossier d'upload, ou dans le dossier des photos de profil.
//
// Points d'attention:
//   - Le disque n'est pas transactionnel: l'appelant écrit le fichier AVANT
//     le commit et appelle `remove` si la transaction échoue
//   - Les fichiers des lignes supprimées sont effacés APRÈS le commit
//
// ============================================================================

use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use std::collections::HashSet;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Uploads,
    ProfilePics,
}

/// Liste d'extensions acceptée pour un upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Document,
    Image,
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub original_name: String,
    pub stored_name: String,
    pub size: i64,
    pub extension: String,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    upload_folder: PathBuf,
    profile_pics_folder: PathBuf,
    max_size: usize,
    allowed_extensions: HashSet<String>,
    allowed_image_extensions: HashSet<String>,
}

impl FileStorage {
    pub fn new(config: &AppConfig) -> Self {
        FileStorage {
            upload_folder: config.upload_folder.clone(),
            profile_pics_folder: config.profile_pics_folder.clone(),
            max_size: config.max_content_length,
            allowed_extensions: config.allowed_extensions.clone(),
            allowed_image_extensions: config.allowed_image_extensions.clone(),
        }
    }

    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_folder).await?;
        tokio::fs::create_dir_all(&self.profile_pics_folder).await
    }

    pub fn path_of(&self, folder: Folder, stored_name: &str) -> PathBuf {
        let base = match folder {
            Folder::Uploads => &self.upload_folder,
            Folder::ProfilePics => &self.profile_pics_folder,
        };
        base.join(stored_name)
    }

    /// Décode, vérifie l'extension et la taille, puis écrit le fichier
    pub async fn save_base64(
        &self,
        folder: Folder,
        kind: UploadKind,
        filename: &str,
        content_base64: &str,
    ) -> Result<StoredFile, AppError> {
        let original_name = secure_filename(filename);
        if original_name.is_empty() {
            return Err(AppError::BadRequest("Invalid filename.".to_string()));
        }

        let extension = extension_of(&original_name)
            .ok_or_else(|| AppError::BadRequest(format!("File type not allowed: {}", original_name)))?;
        let allowed = match kind {
            UploadKind::Document => &self.allowed_extensions,
            UploadKind::Image => &self.allowed_image_extensions,
        };
        if !allowed.contains(&extension) {
            return Err(AppError::BadRequest(format!("File type not allowed: {}", original_name)));
        }

        let bytes = decode_content(content_base64)?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("No file selected.".to_string()));
        }
        if bytes.len() > self.max_size {
            return Err(AppError::BadRequest(format!(
                "File too large (max {} bytes).",
                self.max_size
            )));
        }

        let stored_name = format!("{}.{}", Uuid::new_v4().simple(), extension);
        let path = self.path_of(folder, &stored_name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        tracing::debug!(file = %stored_name, size = bytes.len(), "file stored");

        Ok(StoredFile {
            original_name,
            stored_name,
            size: bytes.len() as i64,
            mime_type: mime_from_extension(&extension).to_string(),
            extension,
        })
    }

    pub async fn read(&self, folder: Folder, stored_name: &str) -> Result<Vec<u8>, AppError> {
        match tokio::fs::read(self.path_of(folder, stored_name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(file = %stored_name, "file missing on disk");
                Err(AppError::not_found("File"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Supprime un fichier; une erreur est seulement loggée
    pub async fn remove(&self, folder: Folder, stored_name: &str) {
        let path = self.path_of(folder, stored_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "could not delete file on disk");
            }
        }
    }

    pub async fn remove_all<I, S>(&self, folder: Folder, stored_names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in stored_names {
            self.remove(folder, name.as_ref()).await;
        }
    }
}

/// Accepte aussi une data URL ("data:image/png;base64,....")
fn decode_content(content: &str) -> Result<Vec<u8>, AppError> {
    let payload = match content.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => content,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|_| AppError::BadRequest("File content is not valid base64.".to_string()))
}

/// Nom de fichier sûr: ASCII alphanumérique, '.', '_' et '-'; pas de chemin
pub fn secure_filename(filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let base = base.rsplit('\\').next().unwrap_or(base);

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

pub fn mime_from_extension(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_config;

    fn storage(dir: &Path) -> FileStorage {
        let mut config = test_config();
        config.upload_folder = dir.join("uploads");
        config.profile_pics_folder = dir.join("pics");
        config.max_content_length = 16;
        FileStorage::new(&config)
    }

    #[test]
    fn filenames_are_sanitised() {
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("my chart (1).png"), "my_chart_1.png");
        assert_eq!(secure_filename("C:\\Users\\me\\shot.JPG"), "shot.JPG");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of("shot.JPG").as_deref(), Some("jpg"));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of(".png"), None);
    }

    #[actix_web::test]
    async fn saves_under_random_name() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        let content = STANDARD.encode(b"hello");

        let stored = storage
            .save_base64(Folder::Uploads, UploadKind::Document, "notes.txt", &content)
            .await
            .unwrap();

        assert_eq!(stored.original_name, "notes.txt");
        assert_ne!(stored.stored_name, "notes.txt");
        assert!(stored.stored_name.ends_with(".txt"));
        assert_eq!(stored.size, 5);
        assert_eq!(stored.mime_type, "text/plain");
        let bytes = storage.read(Folder::Uploads, &stored.stored_name).await.unwrap();
        assert_eq!(bytes, b"hello");

        storage.remove(Folder::Uploads, &stored.stored_name).await;
        assert!(!storage.path_of(Folder::Uploads, &stored.stored_name).exists());
    }

    #[actix_web::test]
    async fn rejects_disallowed_extension_and_oversize() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let exe = storage
            .save_base64(Folder::Uploads, UploadKind::Document, "run.exe", &STANDARD.encode(b"x"))
            .await;
        assert!(matches!(exe, Err(AppError::BadRequest(_))));

        let pdf_as_image = storage
            .save_base64(Folder::Uploads, UploadKind::Image, "doc.pdf", &STANDARD.encode(b"x"))
            .await;
        assert!(matches!(pdf_as_image, Err(AppError::BadRequest(_))));

        let big = storage
            .save_base64(Folder::Uploads, UploadKind::Document, "big.txt", &STANDARD.encode([0u8; 64]))
            .await;
        assert!(matches!(big, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        let encoded = format!("data:image/png;base64,{}", STANDARD.encode(b"png"));
        assert_eq!(decode_content(&encoded).unwrap(), b"png");
        assert!(decode_content("not base64!").is_err());
    }
}
