use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};

use crate::error::ReportError;
use crate::models::{Field, SurveyResponse};
use crate::range::DateRange;

pub const SHEET_NAME: &str = "Survey Responses";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

const COLUMN_WIDTHS: [f64; 12] = [
    6.0, 10.0, 14.0, 20.0, 20.0, 14.0, 14.0, 14.0, 16.0, 14.0, 18.0, 18.0,
];

pub fn headers() -> Vec<&'static str> {
    let mut headers = vec!["ID"];
    headers.extend(Field::ALL.iter().map(|field| field.sheet_header()));
    headers.push("التاريخ");
    headers
}

pub fn render(range: &DateRange, rows: &[SurveyResponse]) -> Result<Vec<u8>, ReportError> {
    let headers = headers();
    let last_col = (headers.len() - 1) as u16;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let border = Color::RGB(0xCBD5E1);

    let title_format = Format::new()
        .set_bold()
        .set_font_size(14)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xEEF2FF))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
        .set_border_color(border);

    let cell_format = Format::new()
        .set_align(FormatAlign::Top)
        .set_text_wrap()
        .set_border(FormatBorder::Thin)
        .set_border_color(border);

    let title = format!("Survey Report ({} to {})", range.from, range.to);
    worksheet.merge_range(0, 0, 0, last_col, &title, &title_format)?;
    worksheet.set_row_height(0, 24)?;

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(1, col as u16, *header, &header_format)?;
    }

    for (index, response) in rows.iter().enumerate() {
        let row = (index + 2) as u32;
        worksheet.write_number_with_format(row, 0, response.id as f64, &cell_format)?;
        for (offset, field) in Field::ALL.iter().enumerate() {
            worksheet.write_string_with_format(
                row,
                (offset + 1) as u16,
                response.value(*field),
                &cell_format,
            )?;
        }
        worksheet.write_string_with_format(
            row,
            last_col,
            response.created_at.format(TIMESTAMP_FORMAT).to_string(),
            &cell_format,
        )?;
    }

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }
    worksheet.set_freeze_panes(2, 0)?;

    Ok(workbook.save_to_buffer()?)
}
