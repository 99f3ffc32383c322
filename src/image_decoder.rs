use crate::types::{DecodedImage, ImageFormat};

const DDS_MAGIC: u32 = 0x2053_4444; // "DDS " little-endian
const DDS_HEADER_SIZE: usize = 128;

/// Classifies and decodes a byte slice into `out`.
///
/// DDS payloads (detected by magic number) are copied verbatim and their
/// dimensions/mip count read from the header; all other formats are handed
/// to the general decoder, which requests four-channel (RGBA8) output.
///
/// Returns `false` on any failure (too short, corrupt header, undecodable
/// pixel data). On failure, `out` is left cleared, not partially populated.
///
/// Pure and stateless: safe to call concurrently from any number of threads.
pub fn decode(data: &[u8], out: &mut DecodedImage) -> bool {
    out.clear();

    if is_dds(data) {
        return decode_dds(data, out);
    }

    decode_general(data, out)
}

fn is_dds(data: &[u8]) -> bool {
    data.len() >= 4 && u32::from_le_bytes([data[0], data[1], data[2], data[3]]) == DDS_MAGIC
}

struct DdsHeader {
    height: i32,
    width: i32,
    mip_map_count: i32,
}

fn parse_dds_header(data: &[u8]) -> Option<DdsHeader> {
    if data.len() < DDS_HEADER_SIZE {
        return None;
    }

    let read_u32 = |offset: usize| -> u32 {
        u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ])
    };

    // Layout after the 4-byte magic: size, flags, height, width,
    // pitchOrLinearSize, depth, mipMapCount, then 11 reserved u32 words.
    let height = read_u32(4 + 8) as i32;
    let width = read_u32(4 + 12) as i32;
    let mip_map_count = read_u32(4 + 24) as i32;

    Some(DdsHeader {
        height,
        width,
        mip_map_count,
    })
}

fn decode_dds(data: &[u8], out: &mut DecodedImage) -> bool {
    let header = match parse_dds_header(data) {
        Some(h) => h,
        None => {
            log::warn!("dds decode failed: payload shorter than header ({} bytes)", data.len());
            return false;
        }
    };

    if header.width <= 0 || header.height <= 0 {
        log::warn!(
            "dds decode failed: invalid dimensions {}x{}",
            header.width,
            header.height
        );
        return false;
    }

    out.pixels = data.to_vec();
    out.width = header.width;
    out.height = header.height;
    out.mip_levels = header.mip_map_count.max(1);
    out.format = ImageFormat::Dds;
    out.is_dds = true;
    out.gpu_format_hint = 0;
    true
}

fn decode_general(data: &[u8], out: &mut DecodedImage) -> bool {
    let decoded = match image::load_from_memory(data) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("general image decode failed: {e}");
            return false;
        }
    };

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    if width == 0 || height == 0 {
        log::warn!("general image decode produced zero-sized image");
        return false;
    }

    out.pixels = rgba.into_raw();
    out.width = width as i32;
    out.height = height as i32;
    out.mip_levels = 1;
    out.format = ImageFormat::Rgba8;
    out.is_dds = false;
    out.gpu_format_hint = 0;
    true
}
