//! QR rendering of a kit's public URL.
//!
//! Stateless: the code only encodes the URL that [`crate::core::verification::public_fetch`]
//! answers on. Rotating the token invalidates every printed code.

use crate::errors::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use qrcode::{QrCode, render::svg};
use serde::Serialize;

/// Token, public URL and its QR code.
#[derive(Debug, Clone, Serialize)]
pub struct KitQr {
    /// Current public token
    pub token: String,
    /// Public fetch URL encoded in the code
    pub url: String,
    /// SVG document
    pub svg: String,
    /// The SVG as a `data:image/svg+xml;base64,` URL, usable as an `<img>` source
    pub data_url: String,
}

/// Public fetch URL for a token under the configured base URL.
#[must_use]
pub fn public_kit_url(base_url: &str, token: &str) -> String {
    format!("{}/public/kits/{token}", base_url.trim_end_matches('/'))
}

/// Renders `url` as an SVG QR code.
pub fn render_svg(url: &str) -> Result<String> {
    let code = QrCode::new(url.as_bytes()).map_err(|e| Error::Qr {
        message: e.to_string(),
    })?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .quiet_zone(true)
        .build())
}

/// Wraps an SVG document in a base64 data URL.
#[must_use]
pub fn svg_data_url(svg: &str) -> String {
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

/// URL and QR code for a kit token.
pub fn kit_qr(base_url: &str, token: &str) -> Result<KitQr> {
    let url = public_kit_url(base_url, token);
    let svg = render_svg(&url)?;
    Ok(KitQr {
        token: token.to_string(),
        url,
        data_url: svg_data_url(&svg),
        svg,
    })
}
