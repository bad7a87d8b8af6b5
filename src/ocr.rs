//! Optical character recognition for scanned images.
//!
//! [`OcrEngine`] is the seam: the extractor only needs an ordered list of
//! recognised regions. [`TesseractOcr`] drives the `tesseract` CLI in TSV
//! mode and groups word rows into lines in detection order.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use crate::config::OcrConfig;

/// One recognised text region. `confidence` is normalised to 0.0–1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrRegion {
    pub text: String,
    pub confidence: f32,
}

/// Blocking image-to-text capability. Called from the worker pool.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &Path) -> Result<Vec<OcrRegion>>;
}

pub struct TesseractOcr {
    command: String,
    languages: String,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            languages: config.languages.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &Path) -> Result<Vec<OcrRegion>> {
        let output = Command::new(&self.command)
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.languages])
            .arg("tsv")
            .output()
            .with_context(|| format!("failed to run '{}'", self.command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.command, output.status, stderr.trim());
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Group tesseract TSV word rows (level 5) into lines.
///
/// Lines keep first-seen order. Rows with negative confidence are layout
/// rows without text and are skipped.
pub fn parse_tsv(tsv: &str) -> Vec<OcrRegion> {
    let mut order: Vec<(u32, u32, u32, u32)> = Vec::new();
    let mut lines: HashMap<(u32, u32, u32, u32), (Vec<String>, Vec<f32>)> = HashMap::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let conf: f32 = match cols[10].trim().parse() {
            Ok(c) => c,
            Err(_) => continue,
        };
        let word = cols[11].trim();
        if conf < 0.0 || word.is_empty() {
            continue;
        }
        let key = match (
            cols[1].parse(),
            cols[2].parse(),
            cols[3].parse(),
            cols[4].parse(),
        ) {
            (Ok(page), Ok(block), Ok(par), Ok(line)) => (page, block, par, line),
            _ => continue,
        };

        let entry = lines.entry(key).or_insert_with(|| {
            order.push(key);
            (Vec::new(), Vec::new())
        });
        entry.0.push(word.to_string());
        entry.1.push(conf);
    }

    order
        .into_iter()
        .filter_map(|key| lines.remove(&key))
        .map(|(words, confs)| {
            let mean = confs.iter().sum::<f32>() / confs.len() as f32;
            OcrRegion {
                text: words.join(" "),
                confidence: (mean / 100.0).clamp(0.0, 1.0),
            }
        })
        .collect()
}
