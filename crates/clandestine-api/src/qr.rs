use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use qrcode::QrCode;
use qrcode::render::svg;
use qrcode::types::QrError;

pub const QR_MIN_SIZE: u32 = 400;

/// Link a scanned invitation opens in the frontend.
pub fn invite_url(frontend_url: &str, token: &str) -> String {
    format!("{}/invite/{}", frontend_url.trim_end_matches('/'), token)
}

/// Render `data` as an SVG QR code wrapped in a `data:` URL.
pub fn render_data_url(data: &str) -> Result<String, QrError> {
    let svg_string = QrCode::new(data.as_bytes())?
        .render::<svg::Color>()
        .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
        .build();

    Ok(format!("data:image/svg+xml;base64,{}", B64.encode(svg_string)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_has_no_double_slash() {
        assert_eq!(
            invite_url("http://localhost:5173/", "abc-123"),
            "http://localhost:5173/invite/abc-123"
        );
        assert_eq!(
            invite_url("https://example.org", "abc-123"),
            "https://example.org/invite/abc-123"
        );
    }

    #[test]
    fn renders_svg_data_url() {
        let url = render_data_url("http://localhost:5173/invite/abc-123").unwrap();
        let payload = url.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(B64.decode(payload).unwrap()).unwrap();
        assert!(svg.contains("<svg"));
    }
}
