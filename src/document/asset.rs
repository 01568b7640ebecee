use std::sync::Mutex;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use super::raster::ImageError;

/// Browsers emit padded base64, but hand-built payloads are often unpadded.
const DATA_URL_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    MissingSeparator,
    EmptyPayload,
    InvalidBase64(base64::DecodeError),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::MissingSeparator => write!(f, "data URL has no ',' separator"),
            DecodeError::EmptyPayload => write!(f, "data URL payload is empty"),
            DecodeError::InvalidBase64(err) => write!(f, "invalid base64 payload: {err}"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode a `<prefix>,<base64>` data URL into raw bytes.
///
/// The prefix is not inspected; the payload is everything after the first
/// comma. ASCII whitespace inside the payload is ignored.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, DecodeError> {
    let (_, payload) = data_url
        .split_once(',')
        .ok_or(DecodeError::MissingSeparator)?;

    let payload = payload.trim();
    if payload.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let decoded = if payload.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        DATA_URL_ENGINE.decode(compact)
    } else {
        DATA_URL_ENGINE.decode(payload)
    };

    decoded.map_err(DecodeError::InvalidBase64)
}

/// Where an optional asset sits in the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetSlot {
    BolImage,
    CompanionPdf,
    Signature,
    /// Zero-based position in the submitted photo list.
    Photo(usize),
}

impl std::fmt::Display for AssetSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetSlot::BolImage => write!(f, "bol_image"),
            AssetSlot::CompanionPdf => write!(f, "bol_pdf"),
            AssetSlot::Signature => write!(f, "signature"),
            AssetSlot::Photo(index) => write!(f, "photo[{index}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FaultCause {
    Decode(DecodeError),
    Image(ImageError),
}

impl std::fmt::Display for FaultCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultCause::Decode(err) => write!(f, "{err}"),
            FaultCause::Image(err) => write!(f, "{err}"),
        }
    }
}

impl From<DecodeError> for FaultCause {
    fn from(err: DecodeError) -> Self {
        FaultCause::Decode(err)
    }
}

impl From<ImageError> for FaultCause {
    fn from(err: ImageError) -> Self {
        FaultCause::Image(err)
    }
}

/// A recovered, per-asset failure. Never fatal for a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetFault {
    pub slot: AssetSlot,
    pub cause: FaultCause,
}

impl AssetFault {
    pub fn new(slot: AssetSlot, cause: impl Into<FaultCause>) -> Self {
        Self {
            slot,
            cause: cause.into(),
        }
    }
}

/// Receives soft asset faults as they are recovered.
pub trait FaultSink: Send + Sync {
    fn report(&self, reference: &str, fault: &AssetFault);
}

/// Logs faults through `tracing`.
pub struct TracingFaultSink;

impl FaultSink for TracingFaultSink {
    fn report(&self, reference: &str, fault: &AssetFault) {
        tracing::warn!(
            reference,
            slot = %fault.slot,
            "Skipping asset: {}",
            fault.cause
        );
    }
}

/// Keeps every reported fault in memory.
#[derive(Default)]
pub struct MemoryFaultSink {
    faults: Mutex<Vec<(String, AssetFault)>>,
}

impl MemoryFaultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> Vec<AssetFault> {
        self.lock().iter().map(|(_, fault)| fault.clone()).collect()
    }

    pub fn faults_for(&self, reference: &str) -> Vec<AssetFault> {
        self.lock()
            .iter()
            .filter(|(r, _)| r == reference)
            .map(|(_, fault)| fault.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, AssetFault)>> {
        self.faults.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FaultSink for MemoryFaultSink {
    fn report(&self, reference: &str, fault: &AssetFault) {
        self.lock().push((reference.to_string(), fault.clone()));
    }
}
