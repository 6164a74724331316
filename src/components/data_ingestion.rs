//! Data ingestion: fetch the raw dataset and unpack it

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::DataIngestionConfig;
use crate::error::{PipelineError, Result};
use crate::utils::get_size_kb;

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Where the raw dataset comes from
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Http(String),
    Local(PathBuf),
}

impl Source {
    fn parse(source: &str) -> Result<Self> {
        let lower = source.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Source::Http(source.to_string()))
        } else if lower.starts_with("file:") {
            url::Url::parse(source)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .map(Source::Local)
                .ok_or_else(|| PipelineError::IngestionError(format!("invalid file URI: {}", source)))
        } else if source.contains("://") {
            Err(PipelineError::IngestionError(format!(
                "unsupported source scheme: {}",
                source
            )))
        } else {
            Ok(Source::Local(PathBuf::from(source)))
        }
    }
}

pub struct DataIngestion {
    config: DataIngestionConfig,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig) -> Self {
        Self { config }
    }

    /// Fetch the source into `local_data_file` unless it is already there
    pub async fn download_file(&self) -> Result<()> {
        let dest = &self.config.local_data_file;
        if dest.exists() {
            info!("File already exists of size: {} KB", get_size_kb(dest)?);
            return Ok(());
        }
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let source = Source::parse(&self.config.source_url)?;
        let partial = partial_path(dest);
        if let Err(e) = fetch(&source, &partial).await {
            if partial.exists() {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    warn!(path = %partial.display(), error = %cleanup, "failed to remove partial download");
                }
            }
            return Err(e);
        }
        tokio::fs::rename(&partial, dest).await?;
        info!(dest = %dest.display(), "dataset stored");
        Ok(())
    }

    /// Unpack `local_data_file` into `unzip_dir` when it is a zip archive
    pub fn extract_zip_file(&self) -> Result<()> {
        let archive_path = &self.config.local_data_file;
        if !is_zip(archive_path)? {
            debug!(path = %archive_path.display(), "not a zip archive, nothing to extract");
            return Ok(());
        }

        let unzip_dir = &self.config.unzip_dir;
        fs::create_dir_all(unzip_dir)?;
        let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let relative = entry.enclosed_name().ok_or_else(|| {
                PipelineError::IngestionError(format!(
                    "archive entry escapes the target directory: {}",
                    entry.name()
                ))
            })?;
            let out_path = unzip_dir.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&out_path)?;
                continue;
            }
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&out_path)?;
            io::copy(&mut entry, &mut out)?;
        }

        info!(
            archive = %archive_path.display(),
            entries = archive.len(),
            dest = %unzip_dir.display(),
            "archive extracted"
        );
        Ok(())
    }
}

/// Sibling file a fetch writes to before it is renamed into place
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

async fn fetch(source: &Source, out: &Path) -> Result<()> {
    match source {
        Source::Http(url) => {
            let response = reqwest::get(url)
                .await
                .map_err(|e| PipelineError::IngestionError(format!("{}: {}", url, e)))?;
            let status = response.status();
            if !status.is_success() {
                return Err(PipelineError::IngestionError(format!(
                    "download of {} failed with HTTP {}",
                    url, status
                )));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| PipelineError::IngestionError(format!("{}: {}", url, e)))?;
            tokio::fs::write(out, &bytes).await?;
            debug!(url = %url, bytes = bytes.len(), "dataset downloaded");
        }
        Source::Local(path) => {
            if !path.is_file() {
                return Err(PipelineError::IngestionError(format!(
                    "source file not found: {}",
                    path.display()
                )));
            }
            let bytes = tokio::fs::copy(path, out).await?;
            debug!(src = %path.display(), bytes, "dataset copied");
        }
    }
    Ok(())
}

fn is_zip(path: &Path) -> Result<bool> {
    let mut magic = [0u8; 4];
    let mut file = File::open(path)?;
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == ZIP_MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}
