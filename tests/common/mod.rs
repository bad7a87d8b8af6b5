//! Shared fixtures and fake capabilities for integration tests.
//!
//! Nothing here touches the network or downloads a model.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docrag::config::Config;
use docrag::embedding::Embedder;
use docrag::engine::{Components, RagEngine};
use docrag::generation::Generator;
use docrag::ocr::{OcrEngine, OcrRegion};
use docrag::store::memory::InMemoryStore;
use docrag::store::VectorStore;
use docrag::uploads::UploadStore;

pub const BOW_DIMS: usize = 64;

/// Deterministic bag-of-words embedder: each lowercase alphanumeric token
/// adds 1.0 to an FNV-hashed bucket.
pub struct BagOfWords;

pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; BOW_DIMS];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in token.to_lowercase().bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        v[(hash % BOW_DIMS as u64) as usize] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for BagOfWords {
    fn model_name(&self) -> &str {
        "bag-of-words"
    }
    fn dims(&self) -> usize {
        BOW_DIMS
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "bag-of-words"
    }
    fn dims(&self) -> usize {
        BOW_DIMS
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("embedding backend unavailable")
    }
}

/// Records every prompt and answers with a fixed reply after an optional delay.
pub struct RecordingGenerator {
    pub reply: String,
    pub delay: Duration,
    pub prompts: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl RecordingGenerator {
    pub fn new(reply: &str) -> Arc<Self> {
        Self::slow(reply, Duration::ZERO)
    }

    pub fn slow(reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            delay,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn model_name(&self) -> &str {
        "recording"
    }
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.reply.clone())
    }
}

/// OCR engine that returns canned regions for any image.
pub struct FakeOcr {
    pub regions: Vec<OcrRegion>,
}

impl FakeOcr {
    pub fn lines(lines: &[(&str, f32)]) -> Arc<Self> {
        Arc::new(Self {
            regions: lines
                .iter()
                .map(|(text, confidence)| OcrRegion {
                    text: text.to_string(),
                    confidence: *confidence,
                })
                .collect(),
        })
    }
}

impl OcrEngine for FakeOcr {
    fn recognize(&self, _image: &Path) -> Result<Vec<OcrRegion>> {
        Ok(self.regions.clone())
    }
}

pub struct Harness {
    pub tmp: tempfile::TempDir,
    pub config: Config,
    pub store: Arc<InMemoryStore>,
    pub generator: Arc<RecordingGenerator>,
    pub engine: Arc<RagEngine>,
    pub uploads: Arc<UploadStore>,
}

pub fn test_config(tmp: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.store.path = tmp.path().join("vector_db");
    config.uploads.dir = tmp.path().join("docs");
    config.chunking.max_tokens = 64;
    config.chunking.overlap_tokens = 8;
    config.retrieval.similarity_floor = Some(0.05);
    config
}

pub async fn harness_with(
    config: impl FnOnce(&mut Config),
    embedder: Arc<dyn Embedder>,
    generator: Arc<RecordingGenerator>,
    ocr: Arc<dyn OcrEngine>,
) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = test_config(&tmp);
    config(&mut cfg);
    let store = Arc::new(InMemoryStore::new());
    let engine = RagEngine::with_components(
        &cfg,
        Components {
            store: Arc::clone(&store) as Arc<dyn VectorStore>,
            embedder,
            generator: Arc::clone(&generator) as Arc<dyn Generator>,
            ocr,
        },
    )
    .await
    .unwrap();
    let uploads = Arc::new(UploadStore::new(cfg.uploads.dir.clone()));
    Harness {
        tmp,
        config: cfg,
        store,
        generator,
        engine: Arc::new(engine),
        uploads,
    }
}

pub async fn harness() -> Harness {
    harness_with(
        |_| {},
        Arc::new(BagOfWords),
        RecordingGenerator::new("The total amount is $42 [1]."),
        FakeOcr::lines(&[]),
    )
    .await
}

/// Single-font PDF with one page per entry; each page draws one text line.
///
/// Object layout: 1 catalog, 2 page tree, 3 font, then a page/content pair
/// per page. Offsets and stream lengths are computed, not hard-coded.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut offsets = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect::<Vec<_>>()
        .join(" ");

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "2 0 obj << /Type /Pages /Kids [{}] /Count {} >> endobj\n",
            kids,
            pages.len()
        )
        .as_bytes(),
    );
    offsets.push(out.len());
    out.extend_from_slice(
        b"3 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );

    for (i, text) in pages.iter().enumerate() {
        let page_obj = 4 + 2 * i;
        let content_obj = page_obj + 1;
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >> endobj\n",
                page_obj, content_obj
            )
            .as_bytes(),
        );
        let stream = format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET", text);
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                content_obj,
                stream.len(),
                stream
            )
            .as_bytes(),
        );
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            offsets.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

/// Minimal .docx whose body holds one `w:p` per entry.
pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
        body
    );

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}
