// src/frame_decode.rs
//
// Camera frames arrive from the browser as `data:image/jpeg;base64,...`
// URLs. Decode them into the RGB frames the pipeline works on.

use crate::types::Frame;
use anyhow::{bail, Context, Result};
use base64::Engine;

/// Decode a data URL, or bare base64, holding an encoded image
pub fn decode_data_url(data_url: &str) -> Result<Frame> {
    let payload = match data_url.split_once(',') {
        Some((header, payload)) => {
            if !header.ends_with(";base64") {
                bail!("Data URL is not base64 encoded");
            }
            payload
        }
        None => data_url,
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .context("Invalid base64 frame data")?;
    decode_image_bytes(&bytes)
}

/// Decode JPEG/PNG/... bytes into an RGB frame
pub fn decode_image_bytes(bytes: &[u8]) -> Result<Frame> {
    if bytes.is_empty() {
        bail!("Empty image data");
    }

    let image = image::load_from_memory(bytes).context("Failed to decode image")?;
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    Ok(Frame {
        data: rgb.into_raw(),
        width: width as usize,
        height: height as usize,
        timestamp_ms: 0.0,
    })
}
