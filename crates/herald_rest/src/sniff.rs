//! Best-effort content type detection from magic bytes.

/// Fallback when nothing matches.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess a MIME type from the first bytes of a file.
///
/// # Example
///
/// ```
/// use herald_rest::sniff_content_type;
///
/// assert_eq!(sniff_content_type(b"%PDF-1.7"), Some("application/pdf"));
/// assert_eq!(sniff_content_type(b"plain"), None);
/// ```
pub fn sniff_content_type(data: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"ID3", "audio/mpeg"),
        (b"OggS", "audio/ogg"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1a\x45\xdf\xa3", "video/webm"),
        (b"BM", "image/bmp"),
    ];

    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if data.len() >= 8 && &data[4..8] == b"ftyp" {
        return Some("video/mp4");
    }
    // MPEG audio frame sync without an ID3 tag.
    if data.len() >= 2 && data[0] == 0xff && data[1] & 0xe0 == 0xe0 && data[1] != 0xff {
        return Some("audio/mpeg");
    }

    SIGNATURES
        .iter()
        .find(|(magic, _)| data.starts_with(magic))
        .map(|(_, mime)| *mime)
}

/// Sniffed type or [`OCTET_STREAM`].
pub fn content_type_or_default(data: &[u8]) -> &'static str {
    sniff_content_type(data).unwrap_or(OCTET_STREAM)
}
