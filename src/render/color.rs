/// Color helpers: HSV brightness scaling and contrast selection.
use image::Rgb;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Scale the HSV value channel of `color` by `brightness`.
/// Channels are truncated back to bytes, values above 1.0 saturate.
pub fn modify_brightness(color: Rgb<u8>, brightness: f32) -> Rgb<u8> {
    let [r, g, b] = color.0;
    let (h, s, v) = rgb_to_hsv(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
    let (r, g, b) = hsv_to_rgb(h, s, v * brightness as f64);
    Rgb([to_byte(r), to_byte(g), to_byte(b)])
}

/// Text color that stays legible over a region with the given mean
/// channel value.
pub fn contrast_for(mean: f64) -> Rgb<u8> {
    if mean < 128.0 { WHITE } else { BLACK }
}

fn to_byte(value: f64) -> u8 {
    (value * 255.0) as u8
}

fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == min {
        return (0.0, 0.0, max);
    }

    let delta = max - min;
    let s = delta / max;
    let rc = (max - r) / delta;
    let gc = (max - g) / delta;
    let bc = (max - b) / delta;

    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    ((h / 6.0).rem_euclid(1.0), s, max)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }

    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match sector as i64 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_brightness_keeps_exact_colors() {
        for color in [
            WHITE,
            BLACK,
            Rgb([255, 0, 0]),
            Rgb([0, 0, 255]),
            Rgb([255, 255, 0]),
            Rgb([128, 128, 128]),
        ] {
            assert_eq!(modify_brightness(color, 1.0), color);
        }
    }

    #[test]
    fn test_round_trip_truncates() {
        // the HSV round trip lands just under 12/255 and truncates down
        assert_eq!(modify_brightness(Rgb([12, 200, 99]), 1.0), Rgb([11, 200, 99]));
    }

    #[test]
    fn test_zero_brightness_is_black() {
        assert_eq!(modify_brightness(Rgb([180, 40, 220]), 0.0), BLACK);
    }

    #[test]
    fn test_half_brightness_halves_value() {
        assert_eq!(modify_brightness(Rgb([255, 0, 0]), 0.5), Rgb([127, 0, 0]));
        assert_eq!(modify_brightness(WHITE, 0.5), Rgb([127, 127, 127]));
    }

    #[test]
    fn test_hue_survives_dimming() {
        let dimmed = modify_brightness(Rgb([0, 255, 0]), 0.25);
        assert_eq!(dimmed.0[0], 0);
        assert_eq!(dimmed.0[2], 0);
        assert!(dimmed.0[1] > 0);
    }

    #[test]
    fn test_contrast_threshold() {
        assert_eq!(contrast_for(200.0), BLACK);
        assert_eq!(contrast_for(50.0), WHITE);
        assert_eq!(contrast_for(127.9), WHITE);
        assert_eq!(contrast_for(128.0), BLACK);
    }
}
