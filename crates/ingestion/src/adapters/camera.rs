//! Camera image adapter (`.jpg`)

use bytes::Bytes;
use contracts::{CompressedImageData, SensorPayload};

use crate::error::{IngestionError, Result};

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Pass JPEG bytes through after a signature check
pub fn decode(raw: Bytes) -> Result<SensorPayload> {
    if !raw.starts_with(&JPEG_SOI) {
        return Err(IngestionError::Signature { format: "jpeg" });
    }
    Ok(SensorPayload::CompressedImage(CompressedImageData {
        format: "jpeg".to_string(),
        data: raw,
    }))
}
