//! Formatting helpers for the workbook export

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder};

pub fn create_header_format() -> Format {
    Format::new()
        .set_bold()
        .set_text_wrap()
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin)
}

pub fn create_not_applicable_format() -> Format {
    Format::new().set_font_color(Color::RGB(0x808080)) // Gray
}

pub fn create_number_format() -> Format {
    Format::new().set_align(FormatAlign::Center)
}
