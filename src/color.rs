//! Device color arrays to 8-bit RGB.

use lopdf::{Document, Object};

use crate::utils::{as_number, maybe_deref};

pub type Rgb = [u8; 3];

pub const BLACK: Rgb = [0, 0, 0];

fn clamp_channel(v: f64) -> u8 {
    // Truncates toward zero before clamping.
    let v = v.trunc();
    if v < 0.0 {
        0
    } else if v > 255.0 {
        255
    } else {
        v as u8
    }
}

fn gray_to_rgb(g: f64) -> Rgb {
    let c = clamp_channel(g * 255.0);
    [c, c, c]
}

fn rgb_to_rgb(r: f64, g: f64, b: f64) -> Rgb {
    [
        clamp_channel(r * 255.0),
        clamp_channel(g * 255.0),
        clamp_channel(b * 255.0),
    ]
}

/// Polynomial approximation of an uncalibrated CMYK to sRGB conversion.
fn cmyk_to_rgb(c: f64, m: f64, y: f64, k: f64) -> Rgb {
    let r = c
        * (-4.387332384609988 * c + 54.48615194189176 * m + 18.82290502165302 * y
            + 212.25662451639585 * k
            - 285.2331026137004)
        + m * (1.7149763477362134 * m - 5.6096736904047315 * y - 17.873870861415444 * k
            - 5.497006427196366)
        + y * (-2.5217340131683033 * y - 21.248923337353073 * k + 17.5119270841813)
        + k * (-21.86122147463605 * k - 189.48180835922747)
        + 255.0;
    let g = c
        * (8.841041422036149 * c + 60.118027045597366 * m + 6.871425592049007 * y
            + 31.159100130055922 * k
            - 79.2970844816548)
        + m * (-15.310361306967817 * m + 17.575251261109482 * y + 131.35250912493976 * k
            - 190.9453302588951)
        + y * (4.444339102852739 * y + 9.8632861493405 * k - 24.86741582555878)
        + k * (-20.737325471181034 * k - 187.80453709719578)
        + 255.0;
    let b = c
        * (0.8842522430003296 * c + 8.078677503112928 * m + 30.89978309703729 * y
            - 0.23883238689178934 * k
            - 14.183576799673286)
        + m * (10.49593273432072 * m + 63.02378494754052 * y + 50.606957656360734 * k
            - 112.23884253719248)
        + y * (0.03296041114873217 * y + 115.60384449646641 * k - 193.58209356861505)
        + k * (-22.33816807309886 * k - 180.12613974708367)
        + 255.0;

    [clamp_channel(r), clamp_channel(g), clamp_channel(b)]
}

/// Convert color components by their count.
///
/// An empty array means transparent and yields `None`. Unsupported lengths
/// fall back to opaque black.
pub fn resolve_components(components: &[f64]) -> Option<Rgb> {
    match *components {
        [] => None,
        [g] => Some(gray_to_rgb(g)),
        [r, g, b] => Some(rgb_to_rgb(r, g, b)),
        [c, m, y, k] => Some(cmyk_to_rgb(c, m, y, k)),
        _ => Some(BLACK),
    }
}

/// Resolve a `/C`-style entry. Anything other than an array (including a
/// missing entry) is black.
pub fn resolve_color(doc: &Document, color: Option<&Object>) -> Option<Rgb> {
    let array = match color.and_then(|c| maybe_deref(doc, c)) {
        Some(Object::Array(array)) => array,
        _ => return Some(BLACK),
    };

    let components: Vec<f64> = array
        .iter()
        .map(|o| maybe_deref(doc, o).and_then(as_number).unwrap_or(0.0))
        .collect();
    resolve_components(&components)
}
