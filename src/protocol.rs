/*!
 # KS03 binary command protocol

 Frame layouts for the write characteristic. Two frame kinds exist: a
 4-byte power frame and an 8-byte color+brightness frame. The protocol is
 fire-and-forget; the strip sends no acknowledgment payload.

 Encoding is a pure function of [`LightState`], so identical state always
 produces identical bytes.
*/

use crate::color::hsv_to_rgb;

/// Power-on command frame
pub const POWER_ON_FRAME: [u8; 4] = [0x5B, 0xF0, 0x00, 0xB5];

/// Power-off command frame
pub const POWER_OFF_FRAME: [u8; 4] = [0x5B, 0x0F, 0x00, 0xB5];

/// Header of the color+brightness command frame
pub const COLOR_FRAME_HEADER: [u8; 4] = [0x69, 0x96, 0x05, 0x02];

/// Cached logical state of one LED strip.
///
/// This is the session's in-process belief about the hardware, updated as
/// commands are issued. The strip is assumed off with a neutral color until
/// the first real command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    /// Whether the strip is on
    pub power: bool,
    /// Brightness percentage (0-100)
    pub brightness: u8,
    /// Hue in degrees (0-359)
    pub hue: u16,
    /// Saturation percentage (0-100)
    pub saturation: u8,
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            power: false,
            brightness: 100,
            hue: 0,
            saturation: 0,
        }
    }
}

/// Returns the power command frame for the requested state.
pub fn power_frame(on: bool) -> [u8; 4] {
    if on {
        POWER_ON_FRAME
    } else {
        POWER_OFF_FRAME
    }
}

/// Encodes the full color+brightness command frame for a state.
///
/// Layout: `69 96 05 02 <R> <G> <B> <brightness>`, where R/G/B come from
/// the HSV conversion (already scaled by brightness) and the trailing byte
/// is the brightness percentage rescaled to 0-255.
pub fn color_frame(state: &LightState) -> [u8; 8] {
    let (r, g, b) = hsv_to_rgb(
        f64::from(state.hue),
        f64::from(state.saturation),
        f64::from(state.brightness),
    );
    let brightness = (f64::from(state.brightness.min(100)) / 100.0 * 255.0).round() as u8;

    let mut frame = [0u8; 8];
    frame[..4].copy_from_slice(&COLOR_FRAME_HEADER);
    frame[4] = r;
    frame[5] = g;
    frame[6] = b;
    frame[7] = brightness;
    frame
}

/// Renders a frame as uppercase hex, two digits per byte.
pub fn frame_hex(frame: &[u8]) -> String {
    frame.iter().map(|b| format!("{b:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_frames_match_protocol_literals() {
        assert_eq!(frame_hex(&power_frame(true)), "5BF000B5");
        assert_eq!(frame_hex(&power_frame(false)), "5B0F00B5");
    }

    #[test]
    fn full_red_color_frame() {
        let state = LightState {
            power: true,
            brightness: 100,
            hue: 0,
            saturation: 100,
        };
        assert_eq!(frame_hex(&color_frame(&state)), "69960502FF0000FF");
    }

    #[test]
    fn default_state_is_neutral_and_off() {
        let state = LightState::default();
        assert!(!state.power);
        assert_eq!((state.brightness, state.hue, state.saturation), (100, 0, 0));
        // Neutral color at full brightness: white channels, full brightness byte.
        assert_eq!(frame_hex(&color_frame(&state)), "69960502FFFFFFFF");
    }

    #[test]
    fn encoding_is_deterministic() {
        let state = LightState {
            power: true,
            brightness: 73,
            hue: 211,
            saturation: 42,
        };
        assert_eq!(color_frame(&state), color_frame(&state));
        assert_eq!(power_frame(true), power_frame(true));
    }

    #[test]
    fn brightness_byte_is_rescaled() {
        let state = LightState {
            power: true,
            brightness: 50,
            hue: 0,
            saturation: 0,
        };
        // round(50 / 100 * 255) = 128, same gray in all channels.
        assert_eq!(frame_hex(&color_frame(&state)), "6996050280808080");
    }

    #[test]
    fn zero_brightness_is_all_zero_payload() {
        let state = LightState {
            power: true,
            brightness: 0,
            hue: 120,
            saturation: 100,
        };
        assert_eq!(frame_hex(&color_frame(&state)), "6996050200000000");
    }
}
