/*!
 # HSV to RGB color conversion

 The KS03 wire protocol carries raw RGB bytes, while the host-facing API
 speaks hue/saturation/brightness. This module holds the conversion.
*/

/// Converts an HSV color to an RGB byte triple.
///
/// # Arguments
///
/// * `hue` - Hue in degrees; wrapped modulo 360, so any value is accepted
/// * `saturation` - Saturation percentage (0-100), clamped
/// * `value` - Brightness percentage (0-100), clamped
///
/// Uses the standard six-sector conversion and rounds each channel to the
/// nearest byte. Saturation 0 yields a gray proportional to `value`;
/// value 0 yields black regardless of the other inputs.
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> (u8, u8, u8) {
    let h = hue.rem_euclid(360.0);
    let s = saturation.clamp(0.0, 100.0) / 100.0;
    let v = value.clamp(0.0, 100.0) / 100.0;

    let chroma = v * s;
    let sector = h / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());

    let (r1, g1, b1) = match sector as u8 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    let m = v - chroma;
    (
        ((r1 + m) * 255.0).round() as u8,
        ((g1 + m) * 255.0).round() as u8,
        ((b1 + m) * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_saturation_is_grayscale() {
        for hue in [0.0, 45.0, 123.0, 359.0] {
            for brightness in [0.0f64, 25.0, 50.0, 100.0] {
                let expected = (brightness / 100.0 * 255.0).round() as u8;
                assert_eq!(
                    hsv_to_rgb(hue, 0.0, brightness),
                    (expected, expected, expected),
                    "hue={hue} brightness={brightness}"
                );
            }
        }
    }

    #[test]
    fn zero_value_is_black() {
        for hue in [0.0, 90.0, 180.0, 270.0] {
            for saturation in [0.0, 50.0, 100.0] {
                assert_eq!(hsv_to_rgb(hue, saturation, 0.0), (0, 0, 0));
            }
        }
    }

    #[test]
    fn hue_wraps_modulo_360() {
        for hue in [0.0, 60.0, 150.0, 240.0, 330.0] {
            assert_eq!(
                hsv_to_rgb(hue, 100.0, 100.0),
                hsv_to_rgb(hue + 360.0, 100.0, 100.0)
            );
            assert_eq!(
                hsv_to_rgb(hue, 100.0, 100.0),
                hsv_to_rgb(hue - 360.0, 100.0, 100.0)
            );
        }
    }

    #[test]
    fn primary_and_secondary_colors() {
        assert_eq!(hsv_to_rgb(0.0, 100.0, 100.0), (255, 0, 0));
        assert_eq!(hsv_to_rgb(60.0, 100.0, 100.0), (255, 255, 0));
        assert_eq!(hsv_to_rgb(120.0, 100.0, 100.0), (0, 255, 0));
        assert_eq!(hsv_to_rgb(180.0, 100.0, 100.0), (0, 255, 255));
        assert_eq!(hsv_to_rgb(240.0, 100.0, 100.0), (0, 0, 255));
        assert_eq!(hsv_to_rgb(300.0, 100.0, 100.0), (255, 0, 255));
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        assert_eq!(hsv_to_rgb(0.0, 150.0, 100.0), hsv_to_rgb(0.0, 100.0, 100.0));
        assert_eq!(hsv_to_rgb(0.0, -20.0, 100.0), hsv_to_rgb(0.0, 0.0, 100.0));
        assert_eq!(hsv_to_rgb(0.0, 100.0, 120.0), hsv_to_rgb(0.0, 100.0, 100.0));
    }

    #[test]
    fn half_brightness_red() {
        assert_eq!(hsv_to_rgb(0.0, 100.0, 50.0), (128, 0, 0));
    }
}
