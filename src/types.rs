//! Shared data types passed between the file loader pool, the decoder, and
//! the texture cache.

/// A request to load (and optionally decode) a named asset.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub filename: String,
    pub request_id: u32,
    pub decode_image: bool,
}

/// The outcome of a `LoadRequest`, returned via the completion queue.
///
/// If `has_decoded_image` is true, `file_bytes` is empty: the raw payload
/// was consumed by the decoder and the decoded pixels supersede it. If
/// false, `file_bytes` holds the raw archive payload — either because decode
/// wasn't requested, or because it was requested and failed; the two cases
/// are indistinguishable to the consumer by design.
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub filename: String,
    pub request_id: u32,
    pub file_bytes: Vec<u8>,
    pub decoded_image: DecodedImage,
    pub has_decoded_image: bool,
}

/// Pixel format produced by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Unknown,
    Rgba8,
    Rgb8,
    Dds,
}

/// Decoded (or passed-through) image payload.
///
/// For `Rgba8`, `pixels.len() == 4 * width * height`. For `Dds`, `pixels`
/// holds the original file bytes verbatim (header plus mip chain); the GPU
/// uploader is responsible for interpreting them. `gpu_format_hint` is an
/// opaque slot for a future GPU-format hint; this crate always sets it to 0
/// and never inspects it after setting it.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: i32,
    pub height: i32,
    pub format: ImageFormat,
    pub is_dds: bool,
    pub mip_levels: i32,
    pub gpu_format_hint: u32,
}

impl Default for DecodedImage {
    fn default() -> Self {
        Self {
            pixels: Vec::new(),
            width: 0,
            height: 0,
            format: ImageFormat::Unknown,
            is_dds: false,
            mip_levels: 1,
            gpu_format_hint: 0,
        }
    }
}

impl DecodedImage {
    pub fn clear(&mut self) {
        self.pixels.clear();
        self.width = 0;
        self.height = 0;
        self.format = ImageFormat::Unknown;
        self.is_dds = false;
        self.mip_levels = 1;
        self.gpu_format_hint = 0;
    }

    pub fn is_valid(&self) -> bool {
        self.format != ImageFormat::Unknown && self.width > 0 && self.height > 0 && !self.pixels.is_empty()
    }

    pub fn data_size(&self) -> usize {
        self.pixels.len()
    }
}

/// A decoded texture held by the [`crate::texture_cache::TextureCache`].
///
/// `memory_size` is authoritative for cache budgeting and is declared by the
/// caller; it may differ from `pixels.len()` if GPU-side overhead should be
/// counted too.
#[derive(Debug, Clone)]
pub struct CachedTexture {
    pub pixels: Vec<u8>,
    pub width: i32,
    pub height: i32,
    pub memory_size: usize,
    pub filename: String,
}

const DECODE_EXTENSIONS: &[&str] = &["dds", "png", "jpg", "jpeg", "tga", "bmp"];

/// Determines whether a filename should be decoded after its raw bytes are
/// read, based solely on its extension (case-insensitive).
pub fn should_decode(filename: &str) -> bool {
    match filename.rsplit('.').next() {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            DECODE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_extension_is_case_insensitive() {
        assert!(should_decode("a.PNG"));
        assert!(should_decode("a.Dds"));
        assert!(!should_decode("a.txt"));
        assert!(!should_decode("a"));
    }

    #[test]
    fn decoded_image_clear_resets_all_fields() {
        let mut img = DecodedImage {
            pixels: vec![1, 2, 3],
            width: 4,
            height: 4,
            format: ImageFormat::Rgba8,
            is_dds: false,
            mip_levels: 1,
            gpu_format_hint: 7,
        };
        img.clear();
        assert!(!img.is_valid());
        assert_eq!(img.data_size(), 0);
    }
}
