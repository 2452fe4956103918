//! Terminal rendering of pairing codes

use qrcode::render::unicode;
use qrcode::QrCode;

use crate::domain::traits::PairingDisplay;

/// Prints pairing codes as QR blocks on stdout
#[derive(Debug, Clone, Default)]
pub struct TerminalQr;

impl TerminalQr {
    pub fn render(code: &str) -> Result<String, qrcode::types::QrError> {
        let qr = QrCode::new(code.as_bytes())?;
        Ok(qr
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .quiet_zone(true)
            .build())
    }
}

impl PairingDisplay for TerminalQr {
    fn show(&self, code: &str) {
        match Self::render(code) {
            Ok(block) => println!("{}", block),
            Err(e) => {
                tracing::warn!("Cannot render QR ({}), raw pairing code follows", e);
                println!("{}", code);
            }
        }
    }
}
