use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::ImageError;
use crate::types::{ImagePayload, MediaType};

/// Upload ceiling used when nothing else is configured.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

/// Read a photo from disk and work out its media type from the extension.
///
/// Unknown extensions fall back to `image/jpeg`; the payload carries a warning
/// when that happens.
pub async fn load(path: &Path, max_bytes: u64) -> Result<ImagePayload, ImageError> {
    let read_err = |e: std::io::Error| ImageError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ImageError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(read_err(e)),
    };

    if !meta.is_file() {
        return Err(ImageError::Read {
            path: path.to_path_buf(),
            message: "not a regular file".into(),
        });
    }
    if meta.len() == 0 {
        return Err(ImageError::Empty(path.to_path_buf()));
    }
    if meta.len() > max_bytes {
        return Err(ImageError::TooLarge {
            size: meta.len(),
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(read_err)?;

    // The file may have changed between stat and read.
    if bytes.is_empty() {
        return Err(ImageError::Empty(path.to_path_buf()));
    }
    if bytes.len() as u64 > max_bytes {
        return Err(ImageError::TooLarge {
            size: bytes.len() as u64,
            limit: max_bytes,
        });
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let (media_type, warning) = match MediaType::from_extension(ext) {
        Some(mt) => (mt, None),
        None => {
            warn!(path = %path.display(), ext, "unrecognized image extension, assuming JPEG");
            (
                MediaType::Jpeg,
                Some(format!(
                    "unrecognized image extension '{ext}', sent as image/jpeg"
                )),
            )
        }
    };

    debug!(path = %path.display(), bytes = bytes.len(), media_type = media_type.as_str(), "image loaded");

    Ok(ImagePayload {
        bytes,
        media_type,
        warning,
    })
}
