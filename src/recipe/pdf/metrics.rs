//! Glyph widths of the standard Times fonts, in 1/1000 em, from the Adobe
//! core font metrics.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    TimesRoman,
    TimesBold,
}

impl Font {
    pub fn base_font(self) -> &'static str {
        match self {
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
        }
    }

    pub fn resource_name(self) -> &'static str {
        match self {
            Self::TimesRoman => "F2",
            Self::TimesBold => "F1",
        }
    }

    fn ascii_widths(self) -> &'static [u16; 95] {
        match self {
            Self::TimesRoman => &TIMES_ROMAN,
            Self::TimesBold => &TIMES_BOLD,
        }
    }
}

/// Widths for bytes 0x20..=0x7E
#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

fn glyph_width(byte: u8, font: Font) -> u16 {
    match byte {
        0x20..=0x7E => font.ascii_widths()[usize::from(byte - 0x20)],
        0x97 => 1000,
        // accented capitals
        0xC0..=0xDE => 722,
        _ => 500,
    }
}

/// Width of WinAnsi-encoded text in points
pub fn text_width(text: &[u8], font: Font, size: f32) -> f32 {
    let units: u32 = text.iter().map(|b| u32::from(glyph_width(*b, font))).sum();
    #[expect(
        clippy::cast_precision_loss,
        reason = "line widths stay far below f32 precision limits"
    )]
    let units = units as f32;
    units * size / 1000.0
}
