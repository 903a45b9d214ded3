//! Inline base64 images
//!
//! Recipe images arrive as `data:image/<ext>;base64,<payload>` strings.

use data_encoding::BASE64;

/// Decoded image bytes plus the file extension taken from the MIME subtype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub extension: String,
}

/// Decode a `data:image/...;base64,` URI.
///
/// Returns a user-facing message on failure.
pub fn decode_data_uri(input: &str) -> Result<DecodedImage, String> {
    let input = input.trim();
    if !input.starts_with("data:image") {
        return Err("Upload a valid image as a data:image/<type>;base64 string.".to_string());
    }

    let (header, payload) = input
        .split_once(";base64,")
        .ok_or_else(|| "The image must be base64 encoded.".to_string())?;

    let extension = header
        .rsplit('/')
        .next()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let extension = match extension.as_str() {
        "jpeg" => "jpg".to_string(),
        "svg+xml" => "svg".to_string(),
        _ => extension,
    };
    if extension.is_empty()
        || extension.len() > 10
        || !extension.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err("Unsupported image type.".to_string());
    }

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|_| "The image data is not valid base64.".to_string())?;
    if bytes.is_empty() {
        return Err("The submitted image is empty.".to_string());
    }

    Ok(DecodedImage { bytes, extension })
}
