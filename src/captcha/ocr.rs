//! OCR-based solver for text CAPTCHAs.
//!
//! Pipeline: fetch → decode → greyscale → Otsu threshold (inverted, glyphs
//! white on black) → PNG → `tesseract` on stdin, alphanumeric whitelist,
//! single-word page segmentation.

use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::{CaptchaOutcome, CaptchaSolver};
use crate::error::{Result, ScoutError};
use crate::http_client::Transport;

const CHAR_WHITELIST: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Solver backed by the `tesseract` CLI.
pub struct OcrSolver {
    transport: Arc<dyn Transport>,
    tesseract_path: PathBuf,
}

impl OcrSolver {
    /// `transport` should be the adapter's own, so the image is fetched
    /// through the same proxy and cookie session as the page.
    pub fn new(transport: Arc<dyn Transport>, tesseract_path: PathBuf) -> Self {
        Self {
            transport,
            tesseract_path,
        }
    }

    /// Check if tesseract is available
    pub async fn check_available(&self) -> bool {
        Command::new(&self.tesseract_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok_and(|s| s.success())
    }

    async fn try_solve(&self, image_url: &str) -> Result<String> {
        let fetched = self.transport.get(image_url).await?;
        if fetched.status != 200 {
            return Err(ScoutError::Status {
                status: fetched.status,
                url: fetched.url,
            });
        }

        let png = preprocess(fetched.bytes())?;
        self.recognize(&png).await
    }

    async fn recognize(&self, png: &[u8]) -> Result<String> {
        let whitelist = format!("tessedit_char_whitelist={CHAR_WHITELIST}");
        let mut child = Command::new(&self.tesseract_path)
            .args([
                "stdin",
                "stdout",
                "--psm",
                "8",
                "--oem",
                "3",
                "-c",
                whitelist.as_str(),
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping stdin closes the pipe so tesseract sees EOF
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(ScoutError::Solver(format!(
                "tesseract exited with {}",
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl CaptchaSolver for OcrSolver {
    #[instrument(skip(self))]
    async fn solve(&self, image_url: &str) -> CaptchaOutcome {
        match self.try_solve(image_url).await {
            Ok(text) => {
                let outcome = CaptchaOutcome::from_text(&text);
                debug!(?outcome, "OCR finished");
                outcome
            }
            Err(e) => {
                warn!("Captcha solve failed: {}", e);
                CaptchaOutcome::Unsolved
            }
        }
    }
}

/// Inverted binary threshold at the image's Otsu level.
///
/// Pixels above the level (light background) go to 0, the rest (glyphs) to 255.
pub fn binarize(gray: &GrayImage) -> GrayImage {
    let level = imageproc::contrast::otsu_level(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > level {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

fn preprocess(bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| ScoutError::Solver(format!("cannot decode captcha image: {e}")))?;
    let binary = binarize(&decoded.to_luma8());

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(binary)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ScoutError::Solver(format!("cannot encode captcha image: {e}")))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::mock::MockTransport;

    fn png_bytes(image: GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(image)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn binarize_inverts_around_otsu_level() {
        let gray = GrayImage::from_raw(4, 1, vec![10, 20, 200, 250]).unwrap();
        let binary = binarize(&gray);
        assert_eq!(binary.into_raw(), vec![255, 255, 0, 0]);
    }

    #[test]
    fn binarize_output_is_two_level() {
        let gray = GrayImage::from_fn(16, 16, |x, y| Luma([((x * 16 + y) % 256) as u8]));
        let binary = binarize(&gray);
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn preprocess_rejects_garbage() {
        assert!(matches!(preprocess(b"not an image"), Err(ScoutError::Solver(_))));
    }

    #[test]
    fn preprocess_emits_png() {
        let png = preprocess(&png_bytes(GrayImage::from_pixel(8, 4, Luma([200])))).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[tokio::test]
    async fn non_success_status_is_unsolved() {
        let transport = MockTransport::new().bytes("https://s.test/captcha.png", 403, Vec::new());
        let solver = OcrSolver::new(Arc::new(transport), PathBuf::from("tesseract"));
        assert_eq!(solver.solve("https://s.test/captcha.png").await, CaptchaOutcome::Unsolved);
    }

    #[tokio::test]
    async fn fetch_failure_is_unsolved() {
        let solver = OcrSolver::new(Arc::new(MockTransport::new()), PathBuf::from("tesseract"));
        assert_eq!(solver.solve("https://s.test/missing.png").await, CaptchaOutcome::Unsolved);
    }

    #[tokio::test]
    async fn missing_tesseract_is_unsolved() {
        let transport = MockTransport::new().bytes(
            "https://s.test/captcha.png",
            200,
            png_bytes(GrayImage::from_pixel(8, 4, Luma([255]))),
        );
        let solver = OcrSolver::new(
            Arc::new(transport),
            PathBuf::from("/nonexistent/bin/tesseract"),
        );
        assert!(!solver.check_available().await);
        assert_eq!(solver.solve("https://s.test/captcha.png").await, CaptchaOutcome::Unsolved);
    }
}
