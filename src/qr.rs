// Scannable code printed in the page header.

use image::{Rgb, RgbImage};
use qrcode::QrCode;
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::verification::VerificationRecord;

// Module colour (dark green) and background.
pub const DARK: Rgb<u8> = Rgb([0, 100, 0]);
pub const LIGHT: Rgb<u8> = Rgb([255, 255, 255]);

// Pixels per module in the raster.
const MODULE_PX: u32 = 3;

pub fn payload(department: &str, locality: &str, record: &VerificationRecord) -> String {
    format!(
        "{}\n{}\nVerification ID: {}\nDate: {}\nTotal Plates: {}",
        department,
        locality,
        record.identifier,
        record.date_label(),
        record.total_plates
    )
}

/// Rasterise `payload` as an RGB image with the standard quiet zone.
pub fn render_code(payload: &str) -> Result<RgbImage> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|err| ReportError::Render(format!("scannable code: {}", err)))?;

    let image = code
        .render::<Rgb<u8>>()
        .dark_color(DARK)
        .light_color(LIGHT)
        .module_dimensions(MODULE_PX, MODULE_PX)
        .build();

    debug!(
        modules = code.width(),
        px = image.width(),
        "Scannable code rendered"
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::VerificationId;
    use chrono::NaiveDate;

    fn record() -> VerificationRecord {
        VerificationRecord {
            identifier: VerificationId::from_parts("ETNCH", 2026, 42),
            generated_on: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            total_plates: 281,
        }
    }

    #[test]
    fn payload_carries_every_metadata_line() {
        let text = payload("Excise Dept.", "Hyderabad, Sindh", &record());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Excise Dept.",
                "Hyderabad, Sindh",
                "Verification ID: ETNCH-2026-00042",
                "Date: 2026-10-18",
                "Total Plates: 281",
            ]
        );
    }

    #[test]
    fn code_is_square_with_dark_finder_pattern() {
        let image = render_code(&payload("Excise Dept.", "Hyderabad, Sindh", &record())).unwrap();
        assert_eq!(image.width(), image.height());
        // Quiet zone is four modules wide; the finder pattern starts right after it.
        let origin = 4 * MODULE_PX;
        assert_eq!(*image.get_pixel(0, 0), LIGHT);
        assert_eq!(*image.get_pixel(origin, origin), DARK);
    }

    #[test]
    fn oversized_payload_is_a_render_error() {
        let huge = "X".repeat(8000);
        assert!(matches!(render_code(&huge), Err(ReportError::Render(_))));
    }
}
