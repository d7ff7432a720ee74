//! sRGB to CIE L*a*b* conversion and CIE76 color difference.
//!
//! The conversion uses the D65 illuminant with the 2° standard observer and no
//! color-management profile, so it is a pure function of the 8-bit input.

/// Linear-RGB to XYZ matrix rows (D65, 2° observer).
const RGB_TO_X: [f64; 3] = [0.4124, 0.3576, 0.1805];
const RGB_TO_Y: [f64; 3] = [0.2126, 0.7152, 0.0722];
const RGB_TO_Z: [f64; 3] = [0.0193, 0.1192, 0.9505];

/// Reference white (D65, 2° observer).
const WHITE_X: f64 = 95.047;
const WHITE_Y: f64 = 100.0;
const WHITE_Z: f64 = 108.883;

const LAB_EPSILON: f64 = 0.008856;

/// How the XYZ triple is derived from linear RGB.
///
/// Older sprite tools computed `Y` from the already converted `X`, and `Z` from
/// both converted values, instead of from the linear RGB channels. The result is
/// a slightly skewed color space. `Legacy` reproduces that ordering so palette
/// matches agree byte-for-byte with those tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XyzMode {
    /// Each of X, Y and Z is computed from the linear RGB channels.
    #[default]
    Standard,
    /// Y and Z reuse the freshly computed X (and Y) in place of linear red (and green).
    Legacy,
}

/// A color in CIE L*a*b* space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl Lab {
    /// Converts an 8-bit sRGB color using the standard XYZ matrix.
    #[inline]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgb_with(r, g, b, XyzMode::Standard)
    }

    /// Converts an 8-bit sRGB color with an explicit XYZ derivation.
    pub fn from_rgb_with(r: u8, g: u8, b: u8, mode: XyzMode) -> Self {
        let [x, y, z] = rgb_to_xyz(r, g, b, mode);
        xyz_to_lab(x, y, z)
    }

    /// CIE76 distance to another color.
    #[inline]
    pub fn delta_e(&self, other: &Lab) -> f64 {
        delta_e(self, other)
    }
}

/// CIE76 color difference: the Euclidean distance between two Lab colors.
#[inline]
pub fn delta_e(lhs: &Lab, rhs: &Lab) -> f64 {
    let dl = lhs.l - rhs.l;
    let da = lhs.a - rhs.a;
    let db = lhs.b - rhs.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// Inverse sRGB companding, scaled to 0..=100.
#[inline]
fn linearize(channel: u8) -> f64 {
    let c = channel as f64 / 255.0;
    let linear = if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    };
    linear * 100.0
}

fn rgb_to_xyz(r: u8, g: u8, b: u8, mode: XyzMode) -> [f64; 3] {
    let (r, g, b) = (linearize(r), linearize(g), linearize(b));
    let dot = |m: [f64; 3], c0: f64, c1: f64, c2: f64| m[0] * c0 + m[1] * c1 + m[2] * c2;

    match mode {
        XyzMode::Standard => [
            dot(RGB_TO_X, r, g, b),
            dot(RGB_TO_Y, r, g, b),
            dot(RGB_TO_Z, r, g, b),
        ],
        XyzMode::Legacy => {
            let x = dot(RGB_TO_X, r, g, b);
            let y = dot(RGB_TO_Y, x, g, b);
            let z = dot(RGB_TO_Z, x, y, b);
            [x, y, z]
        }
    }
}

#[inline]
fn lab_transfer(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn xyz_to_lab(x: f64, y: f64, z: f64) -> Lab {
    let fx = lab_transfer(x / WHITE_X);
    let fy = lab_transfer(y / WHITE_Y);
    let fz = lab_transfer(z / WHITE_Z);

    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}
