//! PaddleOCR, EasyOCR and TrOCR backends.
//!
//! These engines only exist as Python packages. Each backend keeps one bridge
//! process running under the configured interpreter, so the engine's model is
//! loaded once and reused for every page. Requests and responses are single
//! JSON lines over the child's stdin and stdout.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::JoinHandle;
use std::time::Instant;

use super::backend::{Language, OcrBackend, OcrBackendType, OcrConfig, OcrError, Recognition};
use super::util::check_python_module;
use crate::model::PageImage;

const BRIDGE_SCRIPT: &str = include_str!("bridge.py");

/// Exit status the bridge uses when the engine module cannot be imported.
const EXIT_IMPORT_ERROR: i32 = 3;

/// Stderr lines kept for error messages when the bridge dies.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    image: &'a Path,
    langs: Vec<&'static str>,
}

#[derive(Debug, Default, Deserialize)]
struct BridgeResponse {
    #[serde(default)]
    text: String,
    confidence: Option<f32>,
    error: Option<String>,
    kind: Option<String>,
}

/// A running bridge process.
struct BridgeWorker {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    stderr_reader: Option<JoinHandle<()>>,
}

impl BridgeWorker {
    fn spawn(python: &Path, args: &[String]) -> Result<Self, OcrError> {
        let mut child = Command::new(python)
            .arg("-c")
            .arg(BRIDGE_SCRIPT)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    OcrError::BackendNotAvailable(format!("{} not found", python.display()))
                }
                _ => OcrError::Io(e),
            })?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            return Err(OcrError::OcrFailed("bridge pipes unavailable".to_string()));
        };

        // Engines log heavily; stderr is drained so the child never blocks on it.
        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        let tail = Arc::clone(&stderr_tail);
        let stderr_reader = std::thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                log::trace!("ocr bridge: {}", line);
                let mut tail = tail.lock().unwrap_or_else(|p| p.into_inner());
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        });

        log::debug!("Started OCR bridge {} (pid {})", python.display(), child.id());

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr_tail,
            stderr_reader: Some(stderr_reader),
        })
    }

    /// Send one request and wait for its response line.
    ///
    /// `Ok(None)` means the process closed its pipes.
    fn call(&mut self, request: &BridgeRequest) -> Result<Option<BridgeResponse>, OcrError> {
        let mut line = serde_json::to_string(request)
            .map_err(|e| OcrError::OcrFailed(format!("encoding bridge request: {}", e)))?;
        line.push('\n');

        if let Err(e) = self
            .stdin
            .write_all(line.as_bytes())
            .and_then(|_| self.stdin.flush())
        {
            return match e.kind() {
                std::io::ErrorKind::BrokenPipe => Ok(None),
                _ => Err(OcrError::Io(e)),
            };
        }

        let mut buf = String::new();
        loop {
            buf.clear();
            if self.stdout.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            if buf.trim_start().starts_with('{') {
                return parse_response(&buf).map(Some);
            }
        }
    }

    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Reap the exited process and describe why it stopped.
    fn exit_error(mut self, install_hint: &str) -> OcrError {
        let status = self.child.wait();
        if let Some(reader) = self.stderr_reader.take() {
            let _ = reader.join();
        }
        let stderr = self
            .stderr_tail
            .lock()
            .map(|tail| tail.iter().cloned().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default();

        match status {
            Ok(status) if status.code() == Some(EXIT_IMPORT_ERROR) => {
                OcrError::BackendNotAvailable(format!("{} ({})", stderr.trim(), install_hint))
            }
            Ok(status) => OcrError::OcrFailed(format!(
                "bridge exited with {}: {}",
                status,
                stderr.lines().last().unwrap_or("").trim()
            )),
            Err(e) => OcrError::Io(e),
        }
    }
}

impl Drop for BridgeWorker {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// OCR backend backed by a Python engine.
pub struct PythonBackend {
    backend: OcrBackendType,
    python: PathBuf,
    min_confidence: f32,
    use_gpu: bool,
    model: String,
    regions: u32,
    available: OnceLock<bool>,
    worker: Mutex<Option<BridgeWorker>>,
}

impl PythonBackend {
    /// Create a backend for `backend`, which must be one of the Python engines.
    pub fn new(backend: OcrBackendType, config: &OcrConfig) -> Result<Self, OcrError> {
        if module_for(backend).is_none() {
            return Err(OcrError::BackendNotAvailable(format!(
                "{} is not a Python engine",
                backend
            )));
        }
        Ok(Self {
            backend,
            python: config.python.clone(),
            min_confidence: config.min_confidence,
            use_gpu: config.use_gpu,
            model: config.trocr_model.clone(),
            regions: config.trocr_regions,
            available: OnceLock::new(),
            worker: Mutex::new(None),
        })
    }

    /// Interpreter this backend runs.
    pub fn python(&self) -> &Path {
        &self.python
    }

    fn module(&self) -> &'static str {
        module_for(self.backend).unwrap_or("")
    }

    fn install_hint(&self) -> &'static str {
        match self.backend {
            OcrBackendType::PaddleOcr => "pip install paddlepaddle paddleocr",
            OcrBackendType::EasyOcr => "pip install easyocr",
            OcrBackendType::TrOcr => "pip install torch transformers pillow",
            OcrBackendType::Tesseract => "",
        }
    }

    fn bridge_args(&self) -> Vec<String> {
        vec![
            self.backend.as_str().to_string(),
            self.min_confidence.to_string(),
            if self.use_gpu { "1" } else { "0" }.to_string(),
            self.model.clone(),
            self.regions.to_string(),
        ]
    }

    fn run_bridge(&self, image_path: &Path, languages: &[Language]) -> Result<BridgeResponse, OcrError> {
        let request = BridgeRequest {
            image: image_path,
            langs: languages.iter().map(|l| l.iso_code()).collect(),
        };

        let mut slot = self
            .worker
            .lock()
            .map_err(|_| OcrError::OcrFailed("OCR bridge lock poisoned".to_string()))?;

        if slot.is_none() {
            *slot = Some(BridgeWorker::spawn(&self.python, &self.bridge_args())?);
        }
        let result = match slot.as_mut() {
            Some(worker) => worker.call(&request),
            None => return Err(OcrError::OcrFailed("OCR bridge not started".to_string())),
        };

        match result {
            Ok(Some(response)) => self.check_response(response),
            Ok(None) => {
                let err = match slot.take() {
                    Some(worker) => worker.exit_error(self.install_hint()),
                    None => OcrError::OcrFailed("OCR bridge stopped".to_string()),
                };
                Err(err)
            }
            Err(e) => {
                if slot.as_mut().is_some_and(|worker| !worker.is_running()) {
                    slot.take();
                }
                Err(e)
            }
        }
    }

    fn check_response(&self, response: BridgeResponse) -> Result<BridgeResponse, OcrError> {
        let Some(msg) = response.error.clone() else {
            return Ok(response);
        };
        Err(match response.kind.as_deref() {
            Some("import") => {
                OcrError::BackendNotAvailable(format!("{} ({})", msg, self.install_hint()))
            }
            Some("model") => OcrError::ModelNotFound(format!("{}: {}", self.model, msg)),
            _ => OcrError::OcrFailed(format!("{} failed: {}", self.backend, msg)),
        })
    }
}

impl OcrBackend for PythonBackend {
    fn backend_type(&self) -> OcrBackendType {
        self.backend
    }

    fn is_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| check_python_module(&self.python, self.module()))
    }

    fn availability_hint(&self) -> String {
        if self.is_available() {
            format!("{} is available", self.backend.display_name())
        } else {
            format!(
                "{} not importable by {}. Install with: {}",
                self.module(),
                self.python.display(),
                self.install_hint()
            )
        }
    }

    fn recognize(&self, image: &PageImage, languages: &[Language]) -> Result<Recognition, OcrError> {
        let start = Instant::now();
        let out = self.run_bridge(image.path(), languages)?;

        log::debug!(
            "{} page {}: {} chars, confidence {:?}",
            self.backend,
            image.page(),
            out.text.chars().count(),
            out.confidence
        );

        Ok(Recognition {
            text: out.text,
            confidence: out.confidence.map(|c| c.clamp(0.0, 1.0)),
            backend: self.backend,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

fn module_for(backend: OcrBackendType) -> Option<&'static str> {
    match backend {
        OcrBackendType::PaddleOcr => Some("paddleocr"),
        OcrBackendType::EasyOcr => Some("easyocr"),
        OcrBackendType::TrOcr => Some("transformers"),
        OcrBackendType::Tesseract => None,
    }
}

fn parse_response(line: &str) -> Result<BridgeResponse, OcrError> {
    serde_json::from_str(line.trim()).map_err(|e| OcrError::InvalidOutput(e.to_string()))
}
