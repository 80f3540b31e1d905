use plotters::style::RGBColor;

/// A colour map interpolated linearly between evenly spaced anchors.
#[derive(Debug, Clone, Copy)]
pub struct Colormap {
    anchors: &'static [RGBColor],
}

pub const RDBU: Colormap = Colormap {
    anchors: &[
        RGBColor(0x67, 0x00, 0x1f),
        RGBColor(0xb2, 0x18, 0x2b),
        RGBColor(0xd6, 0x60, 0x4d),
        RGBColor(0xf4, 0xa5, 0x82),
        RGBColor(0xfd, 0xdb, 0xc7),
        RGBColor(0xf7, 0xf7, 0xf7),
        RGBColor(0xd1, 0xe5, 0xf0),
        RGBColor(0x92, 0xc5, 0xde),
        RGBColor(0x43, 0x93, 0xc3),
        RGBColor(0x21, 0x66, 0xac),
        RGBColor(0x05, 0x30, 0x61),
    ],
};

pub const COOLWARM: Colormap = Colormap {
    anchors: &[
        RGBColor(0x3b, 0x4c, 0xc0),
        RGBColor(0x8d, 0xb0, 0xfe),
        RGBColor(0xdd, 0xdd, 0xdd),
        RGBColor(0xf4, 0x9a, 0x7b),
        RGBColor(0xb4, 0x04, 0x26),
    ],
};

pub const VIRIDIS: Colormap = Colormap {
    anchors: &[
        RGBColor(0x44, 0x01, 0x54),
        RGBColor(0x3b, 0x52, 0x8b),
        RGBColor(0x21, 0x91, 0x8c),
        RGBColor(0x5e, 0xc9, 0x62),
        RGBColor(0xfd, 0xe7, 0x25),
    ],
};

pub const SET2: [RGBColor; 8] = [
    RGBColor(0x66, 0xc2, 0xa5),
    RGBColor(0xfc, 0x8d, 0x62),
    RGBColor(0x8d, 0xa0, 0xcb),
    RGBColor(0xe7, 0x8a, 0xc3),
    RGBColor(0xa6, 0xd8, 0x54),
    RGBColor(0xff, 0xd9, 0x2f),
    RGBColor(0xe5, 0xc4, 0x94),
    RGBColor(0xb3, 0xb3, 0xb3),
];

pub const HISTOGRAM: RGBColor = RGBColor(0x4e, 0x79, 0xa7);

/// Colour of cells without a value.
pub const MISSING: RGBColor = RGBColor(0xee, 0xee, 0xee);

impl Colormap {
    /// The colour at `t`, clamped to `[0, 1]`.
    pub fn at(&self, t: f64) -> RGBColor {
        let last = self.anchors.len() - 1;
        if t.is_nan() {
            return MISSING;
        }
        let pos = t.clamp(0.0, 1.0) * last as f64;
        let lo = (pos.floor() as usize).min(last);
        let hi = (lo + 1).min(last);
        let frac = pos - lo as f64;
        let (a, b) = (self.anchors[lo], self.anchors[hi]);
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
        RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
    }

    /// The colour of `value` on a scale from `lo` to `hi`.
    pub fn scaled(&self, value: f64, lo: f64, hi: f64) -> RGBColor {
        if hi <= lo {
            return self.at(0.5);
        }
        self.at((value - lo) / (hi - lo))
    }

    pub fn first(&self) -> RGBColor {
        self.anchors[0]
    }

    pub fn last(&self) -> RGBColor {
        self.anchors[self.anchors.len() - 1]
    }
}

fn linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.03928 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Relative luminance of `color`.
pub fn luminance(color: RGBColor) -> f64 {
    0.2126 * linear(color.0) + 0.7152 * linear(color.1) + 0.0722 * linear(color.2)
}

/// Black or white, whichever reads better on `background`.
pub fn text_color(background: RGBColor) -> RGBColor {
    if luminance(background) > 0.408 {
        RGBColor(0, 0, 0)
    } else {
        RGBColor(255, 255, 255)
    }
}
