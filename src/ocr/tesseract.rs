//! Tesseract OCR engine, driven through its command-line interface.

use super::{to_grayscale_png, OcrEngine, OcrOutput};
use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Confidence value tesseract reports for rows that carry no word.
const NO_CONFIDENCE: f64 = -1.0;

pub struct TesseractEngine {
    cmd: String,
}

impl TesseractEngine {
    /// `cmd` is the binary path, or a name resolved through `PATH`.
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }

    /// Run tesseract on a PNG fed through stdin, returning its stdout.
    async fn run(&self, png: &[u8], extra_args: &[&str]) -> Result<String> {
        let mut child = Command::new(&self.cmd)
            .args(["stdin", "stdout"])
            .args(extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start tesseract ({})", self.cmd))?;

        let mut stdin = child
            .stdin
            .take()
            .context("tesseract stdin was not captured")?;
        stdin
            .write_all(png)
            .await
            .context("Failed to write image to tesseract")?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for tesseract")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("tesseract exited with {}: {}", output.status, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &[u8]) -> Result<OcrOutput> {
        let image = image.to_vec();
        let png = tokio::task::spawn_blocking(move || to_grayscale_png(&image))
            .await
            .context("Image preprocessing task failed")??;

        let text = self.run(&png, &[]).await?.trim().to_string();

        let confidence = match self.run(&png, &["tsv"]).await {
            Ok(tsv) => mean_confidence(&tsv),
            Err(e) => {
                warn!("tesseract confidence pass failed: {:#}", e);
                None
            }
        };

        info!(
            "tesseract: recognized {} chars (confidence: {:?})",
            text.len(),
            confidence
        );
        Ok(OcrOutput { text, confidence })
    }
}

/// Average the `conf` column of tesseract TSV output, skipping the "no
/// confidence" sentinel, scaled from 0-100 to 0-1.
pub fn mean_confidence(tsv: &str) -> Option<f64> {
    let mut lines = tsv.lines();
    let header = lines.next()?;
    let conf_col = header.split('\t').position(|col| col == "conf")?;

    let values: Vec<f64> = lines
        .filter_map(|line| line.split('\t').nth(conf_col))
        .filter_map(|raw| raw.trim().parse::<f64>().ok())
        .filter(|conf| *conf != NO_CONFIDENCE)
        .collect();

    if values.is_empty() {
        debug!("tesseract reported no word confidences");
        return None;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some((mean / 100.0).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_mean_confidence() {
        let tsv = format!(
            "{}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t10\t50\t20\t90.5\tx\n\
             5\t1\t1\t1\t1\t2\t70\t10\t50\t20\t70.5\t+\n",
            HEADER
        );
        let conf = mean_confidence(&tsv).unwrap();
        assert!((conf - 0.805).abs() < 1e-9);
    }

    #[test]
    fn test_only_sentinels_means_no_confidence() {
        let tsv = format!("{}\n1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t\n", HEADER);
        assert_eq!(mean_confidence(&tsv), None);
    }

    #[test]
    fn test_missing_header_means_no_confidence() {
        assert_eq!(mean_confidence(""), None);
        assert_eq!(mean_confidence("foo\tbar\n1\t2\n"), None);
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let engine = TesseractEngine::new("/nonexistent/tesseract-binary");
        let mut png = Vec::new();
        image::DynamicImage::new_luma8(4, 4)
            .write_to(
                &mut std::io::Cursor::new(&mut png),
                image::ImageOutputFormat::Png,
            )
            .unwrap();

        let err = engine.recognize(&png).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to start tesseract"));
    }
}
