//! OCR engines for pages without a usable text layer.
//!
//! ## Backends
//!
//! - **PaddleOCR**: CNN-based, best Arabic accuracy in practice (default)
//! - **Tesseract**: traditional OCR via the `tesseract` CLI, needs `ara` data
//! - **EasyOCR**: PyTorch-based, slower on CPU
//! - **TrOCR**: transformer line recognizer, English-printed model by default
//!
//! PaddleOCR, EasyOCR and TrOCR run through a Python interpreter. Use
//! [`create_backend`] to build the engine named in an [`OcrConfig`].

mod backend;
mod python;
mod tesseract;
mod util;

pub use backend::{Language, OcrBackend, OcrBackendType, OcrConfig, OcrError, Recognition};
pub use python::PythonBackend;
pub use tesseract::{parse_tsv, tesseract_languages, TesseractBackend, TsvText};
pub use util::{check_binary, check_pdftoppm_hint, check_python_module, resolve_binary};

/// Build the configured backend.
pub fn create_backend(config: &OcrConfig) -> Result<Box<dyn OcrBackend>, OcrError> {
    create_backend_of(config.backend, config)
}

/// Build a specific backend with the shared settings from `config`.
pub fn create_backend_of(
    backend: OcrBackendType,
    config: &OcrConfig,
) -> Result<Box<dyn OcrBackend>, OcrError> {
    match backend {
        OcrBackendType::Tesseract => Ok(Box::new(TesseractBackend::with_config(config))),
        OcrBackendType::PaddleOcr | OcrBackendType::EasyOcr | OcrBackendType::TrOcr => {
            Ok(Box::new(PythonBackend::new(backend, config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_backend_matches_type() {
        for backend in OcrBackendType::ALL {
            let config = OcrConfig::default().with_backend(backend);
            let created = create_backend(&config).unwrap();
            assert_eq!(created.backend_type(), backend);
        }
    }
}
