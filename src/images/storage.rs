use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{Error, Result};

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    fn sniff(data: &[u8]) -> Option<Self> {
        match data {
            [0x89, b'P', b'N', b'G', ..] => Some(Self::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [b'G', b'I', b'F', b'8', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "png" => Some(Self::Png),
            "jpg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

/// Decodes a base64 image, with or without a `data:image/...;base64,`
/// prefix, and checks that the bytes really are an image.
pub fn decode_payload(payload: &str) -> Result<(Vec<u8>, ImageFormat)> {
    let encoded = match payload.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => payload,
    };
    let encoded: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

    let data = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| Error::invalid(format!("Invalid base64 image data: {e}")))?;

    if data.is_empty() {
        return Err(Error::invalid("Image is empty"));
    }
    if data.len() > MAX_IMAGE_BYTES {
        return Err(Error::invalid(format!(
            "Image exceeds {} MB",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }

    let format = ImageFormat::sniff(&data)
        .ok_or_else(|| Error::invalid("Unsupported image format"))?;
    Ok((data, format))
}

/// Content-addressed image files under `{data_dir}/images`. Names are
/// `{sha256}.{ext}`, so uploading the same bytes twice is a no-op.
pub struct ImageStorage {
    base_path: PathBuf,
}

impl ImageStorage {
    pub fn new(base_path: &Path) -> Self {
        Self {
            base_path: base_path.to_path_buf(),
        }
    }

    fn object_path(&self, hash: &str, name: &str) -> PathBuf {
        self.base_path
            .join("objects")
            .join(&hash[0..2])
            .join(&hash[2..4])
            .join(name)
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join("tmp").join(Uuid::new_v4().to_string())
    }

    /// Stores the image and returns its name.
    pub async fn put(&self, data: &[u8], format: ImageFormat) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let hash = hex::encode(hasher.finalize());
        let name = format!("{hash}.{}", format.extension());

        let final_path = self.object_path(&hash, &name);
        if fs::try_exists(&final_path).await? {
            return Ok(name);
        }

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(data).await?;
        temp_file.sync_all().await?;

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&temp_path, &final_path).await?;

        tracing::info!("Stored image {name} ({} bytes)", data.len());
        Ok(name)
    }

    pub async fn get(&self, name: &str) -> Result<(Vec<u8>, ImageFormat)> {
        let (hash, format) =
            parse_name(name).ok_or_else(|| Error::not_found(format!("Image '{name}'")))?;

        match fs::read(self.object_path(hash, name)).await {
            Ok(data) => Ok((data, format)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::not_found(format!("Image '{name}'")))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

fn parse_name(name: &str) -> Option<(&str, ImageFormat)> {
    let (hash, ext) = name.split_once('.')?;
    let valid_hash = hash.len() == 64
        && hash
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
    if !valid_hash {
        return None;
    }
    Some((hash, ImageFormat::from_extension(ext)?))
}
