use std::io::Cursor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use osd_signoff::config::{Config, SmtpConfig};
use osd_signoff::document::asset::MemoryFaultSink;
use osd_signoff::email::{Mailer, OutgoingMail};
use osd_signoff::state::AppState;
use osd_signoff::storage::{ArtifactStore, DirectoryStore};
use osd_signoff::submission::reference::ReferenceId;

/// How the spawned app delivers mail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transport {
    /// No SMTP configuration at all.
    None,
    /// SMTP configured, sends are captured in memory.
    Recording,
    /// SMTP configured, every send fails.
    Failing,
}

/// Captures outgoing mail instead of talking to a server.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), String> {
        if self.fail {
            return Err("Connection refused".to_string());
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

/// Writes the main document to disk but refuses every companion PDF.
pub struct CompanionFailingStore {
    inner: DirectoryStore,
}

#[async_trait]
impl ArtifactStore for CompanionFailingStore {
    async fn persist(&self, reference: &ReferenceId, pdf: &[u8]) -> std::io::Result<PathBuf> {
        self.inner.persist(reference, pdf).await
    }

    async fn persist_companion(
        &self,
        _reference: &ReferenceId,
        _pdf: &[u8],
    ) -> std::io::Result<PathBuf> {
        Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "companion store is read-only",
        ))
    }
}

/// A running server writing into its own temporary output directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub out_dir: TempDir,
    pub faults: Arc<MemoryFaultSink>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Post a submission as JSON, return (body, status).
    pub async fn submit(&self, data: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/osd/submit"))
            .json(data)
            .send()
            .await
            .expect("submit request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Post a raw body with a JSON content type, return (body, status).
    pub async fn submit_raw(&self, body: impl Into<reqwest::Body>) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/osd/submit"))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("raw submit request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub fn document_path(&self, reference: &str) -> PathBuf {
        self.out_dir.path().join(format!("OSD_{reference}.pdf"))
    }

    pub fn companion_path(&self, reference: &str) -> PathBuf {
        self.out_dir.path().join(format!("OSD_{reference}_BOL.pdf"))
    }

    /// Names of every file in the output directory, sorted.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.out_dir.path())
            .expect("read output dir")
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub async fn spawn_app(transport: Transport) -> TestApp {
    spawn_app_with_limit(transport, 25 * 1024 * 1024).await
}

pub async fn spawn_app_with_limit(transport: Transport, max_body_size: usize) -> TestApp {
    spawn(transport, max_body_size, false).await
}

pub async fn spawn_app_failing_companion(transport: Transport) -> TestApp {
    spawn(transport, 25 * 1024 * 1024, true).await
}

async fn spawn(transport: Transport, max_body_size: usize, failing_companion: bool) -> TestApp {
    let out_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let smtp = (transport != Transport::None).then(|| SmtpConfig {
        host: "localhost".to_string(),
        port: 2525,
        secure: false,
        user: Some("smtp-user@example.com".to_string()),
        pass: Some("secret".to_string()),
        notify_to: Some("dispatch@example.com".to_string()),
        from: Some("osd@example.com".to_string()),
    });

    let config = Config {
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        out_dir: out_dir.path().to_path_buf(),
        max_body_size,
        log_level: "warn".to_string(),
        smtp,
    };

    let faults = Arc::new(MemoryFaultSink::new());
    let mailer = Arc::new(RecordingMailer {
        fail: transport == Transport::Failing,
        ..Default::default()
    });

    let mut state = AppState::new(config)
        .expect("Failed to build state")
        .with_mailer(mailer.clone())
        .with_fault_sink(faults.clone());
    if failing_companion {
        state = state.with_store(Arc::new(CompanionFailingStore {
            inner: DirectoryStore::new(out_dir.path()),
        }));
    }
    let app = osd_signoff::build_app(state);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        out_dir,
        faults,
        mailer,
    }
}

/// A solid-color PNG encoded as a data URL.
pub fn png_data_url(width: u32, height: u32) -> String {
    let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([30, 120, 60])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .expect("encode png");
    format!("data:image/png;base64,{}", STANDARD.encode(buf))
}

pub fn pdf_data_url(bytes: &[u8]) -> String {
    format!("data:application/pdf;base64,{}", STANDARD.encode(bytes))
}

pub fn page_count(path: &PathBuf) -> usize {
    lopdf::Document::load(path)
        .expect("stored document should parse")
        .get_pages()
        .len()
}
