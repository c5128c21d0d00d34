//! PNG encoding for composited overlays.
//!
//! Hosts that consume encoded images (rather than raw RGBA buffers)
//! get standard RGBA PNGs: 8-bit color type 6, one zlib-compressed
//! IDAT, no ancillary chunks.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use climate_common::{OverlayError, OverlayResult, RasterImage};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Encode a raster as an RGBA PNG.
pub fn encode(image: &RasterImage) -> OverlayResult<Vec<u8>> {
    let width = image.width();
    let height = image.height();

    let mut out = Vec::with_capacity(width * height + 64);
    out.extend_from_slice(&PNG_SIGNATURE);

    // IHDR: dimensions, bit depth 8, color type 6 (RGBA).
    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
    write_chunk(&mut out, b"IHDR", &ihdr);

    // IDAT: filter byte 0 (None) before each scanline, then zlib.
    let pixels = image.pixels();
    let stride = width * 4;
    let mut raw = Vec::with_capacity(height * (stride + 1));
    for row in pixels.chunks_exact(stride) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder
        .write_all(&raw)
        .map_err(|e| OverlayError::RenderFailed(format!("PNG compression failed: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| OverlayError::RenderFailed(format!("PNG compression failed: {}", e)))?;
    write_chunk(&mut out, b"IDAT", &compressed);

    write_chunk(&mut out, b"IEND", &[]);
    Ok(out)
}

/// Length, type, data, CRC over type+data.
fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());
}
