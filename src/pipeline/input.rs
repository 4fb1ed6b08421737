//! Input resolution: load a deck from a local path or an HTTP(S) URL.
//!
//! Decks are small (the default ceiling is 15 MiB), so the whole file is
//! held in memory and handed to pdfium as a byte slice. The size ceiling and
//! the `%PDF` magic are checked here so that pdfium never sees an oversized
//! or non-PDF upload.

use crate::error::DeckGuardError;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A deck loaded into memory and validated.
#[derive(Debug, Clone)]
pub struct LoadedDeck {
    /// File name shown in reports (last path or URL segment).
    pub name: String,
    pub bytes: Vec<u8>,
}

impl LoadedDeck {
    /// Validate raw bytes against the size ceiling and the PDF magic.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: Vec<u8>,
        max_bytes: u64,
    ) -> Result<Self, DeckGuardError> {
        let name = name.into();
        check_size(&name, bytes.len() as u64, max_bytes)?;
        check_magic(&name, &bytes)?;
        Ok(Self { name, bytes })
    }

    /// Lowercase hex sha256 of the deck bytes.
    pub fn sha256_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the deck named by `input`.
///
/// URLs are downloaded; anything else is treated as a local path.
pub async fn load_input(
    input: &str,
    max_bytes: u64,
    timeout_secs: u64,
) -> Result<LoadedDeck, DeckGuardError> {
    if input.trim().is_empty() {
        return Err(DeckGuardError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, max_bytes, timeout_secs).await
    } else {
        let path = PathBuf::from(input);
        tokio::task::spawn_blocking(move || load_local(&path, max_bytes))
            .await
            .map_err(|e| DeckGuardError::Internal(format!("Input task panicked: {}", e)))?
    }
}

/// Read a local file, checking its size before reading the body.
fn load_local(path: &Path, max_bytes: u64) -> Result<LoadedDeck, DeckGuardError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DeckGuardError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(DeckGuardError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let len = file
        .metadata()
        .map_err(|e| DeckGuardError::Internal(format!("stat {}: {}", path.display(), e)))?
        .len();
    check_size(&name, len, max_bytes)?;

    let mut bytes = Vec::with_capacity(len as usize);
    file.read_to_end(&mut bytes)
        .map_err(|e| DeckGuardError::Internal(format!("read {}: {}", path.display(), e)))?;

    debug!("Loaded local deck: {} ({} bytes)", path.display(), bytes.len());
    LoadedDeck::from_bytes(name, bytes, max_bytes)
}

/// Download a URL into memory.
async fn download_url(
    url: &str,
    max_bytes: u64,
    timeout_secs: u64,
) -> Result<LoadedDeck, DeckGuardError> {
    info!("Downloading deck from: {}", url);

    let parsed = reqwest::Url::parse(url).map_err(|_| DeckGuardError::InvalidInput {
        input: url.to_string(),
    })?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DeckGuardError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let mut response = client.get(parsed.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            DeckGuardError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            DeckGuardError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(DeckGuardError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = filename_from_url(&parsed);

    if let Some(len) = response.content_length() {
        check_size(&name, len, max_bytes)?;
    }

    // Chunked responses carry no length, so the ceiling is enforced while reading.
    let mut bytes = Vec::new();
    loop {
        let chunk = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                DeckGuardError::DownloadTimeout {
                    url: url.to_string(),
                    secs: timeout_secs,
                }
            } else {
                DeckGuardError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        let Some(chunk) = chunk else { break };
        check_size(&name, (bytes.len() + chunk.len()) as u64, max_bytes)?;
        bytes.extend_from_slice(&chunk);
    }

    info!("Downloaded {} bytes", bytes.len());
    LoadedDeck::from_bytes(name, bytes, max_bytes)
}

/// Last non-empty path segment of the URL, or a fixed fallback.
fn filename_from_url(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|last| !last.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

fn check_size(name: &str, size: u64, limit: u64) -> Result<(), DeckGuardError> {
    if size > limit {
        return Err(DeckGuardError::FileTooLarge {
            name: name.to_string(),
            size,
            limit,
        });
    }
    Ok(())
}

fn check_magic(name: &str, bytes: &[u8]) -> Result<(), DeckGuardError> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(DeckGuardError::NotAPdf {
            name: name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}
