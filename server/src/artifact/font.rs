//! Advance widths for the PDF base-14 Helvetica face.
//!
//! Units are 1/1000 em, taken from the standard Helvetica AFM. Only the
//! printable ASCII range is tabulated; anything else measures as a digit.

const FALLBACK_WIDTH: u16 = 556;

#[rustfmt::skip]
const ASCII_WIDTHS: [u16; 95] = [
    // ' '  !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // :    ;    <    =    >    ?    @
    278, 278, 584, 584, 584, 556, 1015,
    // A-Z
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [    \    ]    ^    _    `
    278, 278, 278, 469, 556, 333,
    // a-z
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // {    |    }    ~
    334, 260, 334, 584,
];

fn glyph_width(c: char) -> u16 {
    match c {
        ' '..='~' => ASCII_WIDTHS[c as usize - 0x20],
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` in points at `font_size`.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(glyph_width(c))).sum();
    units as f32 * font_size / 1000.0
}
