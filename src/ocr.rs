//! Recognition front-end: delegates the image to the system `tesseract`
//! binary and returns whatever text it produces, verbatim.

use std::path::Path;
use std::process::Command;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("tesseract is not available on PATH")]
    Unavailable,
    #[error("tesseract failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Run OCR on an image file with a language hint and return the recognized
/// text.
pub fn recognize(image: &Path, lang: &str) -> Result<String, OcrError> {
    if !tesseract_available() {
        return Err(OcrError::Unavailable);
    }

    let started = Instant::now();
    let output = Command::new("tesseract")
        .arg(image)
        .arg("stdout")
        .args(["-l", lang])
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(OcrError::Failed(stderr));
    }

    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    log::info!(
        "recognized {} chars from {} in {}ms",
        text.chars().count(),
        image.display(),
        started.elapsed().as_millis()
    );
    Ok(text)
}

fn tesseract_available() -> bool {
    Command::new("tesseract")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}
