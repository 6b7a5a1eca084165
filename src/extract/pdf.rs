//! PDF staging and text extraction

use super::clean_text;
use sha2::{Digest, Sha256};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// File name for a staged PDF: SHA-256 of the URL, hex encoded
///
/// Distinct URLs never share a staging file.
pub fn staged_pdf_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("{}.pdf", hex::encode(digest))
}

/// Writes a fetched PDF under `download_dir`, creating the directory if needed
pub async fn stage_pdf(download_dir: &Path, url: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(download_dir).await?;
    let path = download_dir.join(staged_pdf_name(url));
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Extracts text from a staged PDF
///
/// Returns an empty string (and logs) when the file is unreadable or
/// malformed. The extractor can panic on some broken inputs, so the call is
/// isolated with `catch_unwind`.
pub fn parse_pdf(path: &Path) -> String {
    let result = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text(path)));
    finish(result, &path.display().to_string())
}

fn finish(
    result: std::thread::Result<Result<String, pdf_extract::OutputError>>,
    source: &str,
) -> String {
    match result {
        Ok(Ok(text)) => clean_text(&text),
        Ok(Err(e)) => {
            tracing::error!("PDF parse error {}: {:?}", source, e);
            String::new()
        }
        Err(_) => {
            tracing::error!("PDF parser panicked on {}", source);
            String::new()
        }
    }
}
