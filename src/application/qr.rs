//! `qr`: a PNG QR code linking to the published site.

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use tracing::info;
use url::Url;

use crate::application::error::AppError;

/// Pixels per QR module.
const MODULE_PIXELS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    pub path: PathBuf,
    pub url: String,
    pub width: u32,
}

/// Encode `url` with low error correction and a four-module quiet zone,
/// then write it to `output` as PNG.
pub fn write_site_qr(url: &str, output: &Path) -> Result<QrImage, AppError> {
    let url = url.trim();
    Url::parse(url)
        .map_err(|err| AppError::validation(format!("`{url}` is not a valid URL: {err}")))?;

    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::L)
        .map_err(|err| AppError::validation(format!("cannot encode `{url}`: {err}")))?;
    let image = code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .module_dimensions(MODULE_PIXELS, MODULE_PIXELS)
        .build();

    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    image
        .save_with_format(output, ImageFormat::Png)
        .map_err(|err| {
            AppError::unexpected(format!("failed to write `{}`: {err}", output.display()))
        })?;

    info!(
        target = "application::qr",
        op = "qr::write",
        result = "ok",
        url = %url,
        path = %output.display(),
        width = image.width(),
        "QR code written"
    );

    Ok(QrImage {
        path: output.to_path_buf(),
        url: url.to_string(),
        width: image.width(),
    })
}
