use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, warn};

use crate::aggregate::{top_n, AggregateReport, FieldCounts};
use crate::error::ReportError;
use crate::shaping;

const PAGE_WIDTH: f32 = 595.2756;
const PAGE_HEIGHT: f32 = 841.8898;
const CM: f32 = 28.346_457;
const MARGIN: f32 = 2.0 * CM;

/// A section starting below this line moves to a fresh page.
const SECTION_BREAK: f32 = 5.2 * CM;
const TOP_AFTER_BREAK: f32 = PAGE_HEIGHT - 3.0 * CM;
const MAX_SECTION_ROWS: usize = 10;
const ROW_STEP: f32 = 16.0;

const INK: Rgb = Rgb(0x0F, 0x17, 0x2A);
const SUBTLE: Rgb = Rgb(0x47, 0x55, 0x69);
const RULE: Rgb = Rgb(0xCB, 0xD5, 0xE1);
const MUTED: Rgb = Rgb(0x64, 0x74, 0x8B);

const TITLE: &str = "تقرير إحصائيات الاستبيان";
const NO_DATA: &str = "لا توجد بيانات";
const FOOTER: &str = "تم إنشاء هذا التقرير تلقائيًا من نظام الاستبيان.";

pub const DEFAULT_FONT_PATH: &str = "static/fonts/Tajawal-Regular.ttf";

#[derive(Clone, Copy)]
struct Rgb(u8, u8, u8);

impl Rgb {
    fn operands(self) -> Vec<Object> {
        [self.0, self.1, self.2]
            .into_iter()
            .map(|c| Object::Real(f32::from(c) / 255.0))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum FontSource {
    TrueType { name: String, data: Vec<u8> },
    Helvetica,
}

impl FontSource {
    pub fn load(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(data) => {
                let name: String = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                    .collect();
                debug!(path = %path.display(), "loaded report font");
                FontSource::TrueType {
                    name: if name.is_empty() { "ReportFont".to_string() } else { name },
                    data,
                }
            }
            Err(e) => {
                warn!(path = %path.display(), "report font unavailable, using Helvetica: {e}");
                FontSource::Helvetica
            }
        }
    }
}

struct EmbeddedFont<'a> {
    name: &'a str,
    data: &'a [u8],
    face: ttf_parser::Face<'a>,
    // glyph id -> (advance in font units, source char)
    used: BTreeMap<u16, (u16, char)>,
}

enum PdfFont<'a> {
    Embedded(EmbeddedFont<'a>),
    Helvetica,
}

impl<'a> PdfFont<'a> {
    fn from_source(source: &'a FontSource) -> Self {
        match source {
            FontSource::TrueType { name, data } => match ttf_parser::Face::parse(data, 0) {
                Ok(face) => PdfFont::Embedded(EmbeddedFont {
                    name,
                    data,
                    face,
                    used: BTreeMap::new(),
                }),
                Err(e) => {
                    warn!(
                        font = %name,
                        "report font is not a usable TrueType file, using Helvetica: {e}"
                    );
                    PdfFont::Helvetica
                }
            },
            FontSource::Helvetica => PdfFont::Helvetica,
        }
    }

    fn encode(&mut self, text: &str) -> (Object, f32) {
        match self {
            PdfFont::Embedded(font) => {
                let scale = 1000.0 / f32::from(font.face.units_per_em());
                let mut bytes = Vec::with_capacity(text.len() * 2);
                let mut width = 0.0;
                for c in text.chars() {
                    let glyph = font.face.glyph_index(c).unwrap_or(ttf_parser::GlyphId(0));
                    let advance = font.face.glyph_hor_advance(glyph).unwrap_or(0);
                    font.used.entry(glyph.0).or_insert((advance, c));
                    bytes.extend_from_slice(&glyph.0.to_be_bytes());
                    width += f32::from(advance) * scale;
                }
                (Object::String(bytes, StringFormat::Hexadecimal), width)
            }
            PdfFont::Helvetica => {
                let bytes: Vec<u8> = text.chars().map(win_ansi).collect();
                let width: u32 = bytes.iter().map(|b| u32::from(helvetica_width(*b))).sum();
                (Object::String(bytes, StringFormat::Literal), width as f32)
            }
        }
    }

    fn add_to(self, doc: &mut Document) -> ObjectId {
        match self {
            PdfFont::Helvetica => doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            }),
            PdfFont::Embedded(font) => font.add_to(doc),
        }
    }
}

impl EmbeddedFont<'_> {
    fn add_to(self, doc: &mut Document) -> ObjectId {
        let scale = 1000.0 / f32::from(self.face.units_per_em());
        let units = |v: i16| (f32::from(v) * scale).round() as i64;
        let bbox = self.face.global_bounding_box();

        let font_file = doc.add_object(Stream::new(
            dictionary! { "Length1" => self.data.len() as i64 },
            self.data.to_vec(),
        ));

        let descriptor = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => self.name,
            "Flags" => 4,
            "FontBBox" => vec![
                Object::Integer(units(bbox.x_min)),
                Object::Integer(units(bbox.y_min)),
                Object::Integer(units(bbox.x_max)),
                Object::Integer(units(bbox.y_max)),
            ],
            "ItalicAngle" => 0,
            "Ascent" => units(self.face.ascender()),
            "Descent" => units(self.face.descender()),
            "CapHeight" => units(self.face.capital_height().unwrap_or(self.face.ascender())),
            "StemV" => 80,
            "FontFile2" => font_file,
        });

        let mut widths: Vec<Object> = Vec::with_capacity(self.used.len() * 2);
        for (glyph, (advance, _)) in &self.used {
            widths.push(i64::from(*glyph).into());
            widths.push(vec![Object::Real(f32::from(*advance) * scale)].into());
        }

        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => self.name,
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor,
            "W" => widths,
            "CIDToGIDMap" => "Identity",
        });

        let to_unicode = doc.add_object(Stream::new(dictionary! {}, to_unicode_cmap(&self.used)));

        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => self.name,
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
            "ToUnicode" => to_unicode,
        })
    }
}

fn to_unicode_cmap(used: &BTreeMap<u16, (u16, char)>) -> Vec<u8> {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<(&u16, &(u16, char))> = used.iter().collect();
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (glyph, (_, c)) in chunk {
            let mut units = [0u16; 2];
            let hex: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            cmap.push_str(&format!("<{glyph:04X}> <{hex}>\n"));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap.into_bytes()
}

fn win_ansi(c: char) -> u8 {
    match u32::from(c) {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
        _ => b'?',
    }
}

fn helvetica_width(byte: u8) -> u16 {
    const ASCII: [u16; 95] = [
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556,
        556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722,
        722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722,
        667, 944, 667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556,
        556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500,
        500, 334, 260, 334, 584,
    ];
    match byte {
        0x20..=0x7E => ASCII[usize::from(byte - 0x20)],
        _ => 556,
    }
}

struct Canvas<'a> {
    font: PdfFont<'a>,
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
}

impl<'a> Canvas<'a> {
    fn new(font: PdfFont<'a>) -> Self {
        Self {
            font,
            pages: Vec::new(),
            ops: Vec::new(),
        }
    }

    fn show_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
    }

    fn text(&mut self, size: f32, color: Rgb, x: f32, y: f32, text: &str) {
        let (encoded, _) = self.font.encode(&shaping::display(text));
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new("rg", color.operands()));
        self.ops.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
        self.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.ops.push(Operation::new("Tj", vec![encoded]));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn text_right(&mut self, size: f32, color: Rgb, right: f32, y: f32, text: &str) {
        let (_, width) = self.font.encode(&shaping::display(text));
        let x = right - width * size / 1000.0;
        self.text(size, color, x, y, text);
    }

    fn rule(&mut self, color: Rgb, x1: f32, x2: f32, y: f32) {
        self.ops.push(Operation::new("RG", color.operands()));
        self.ops.push(Operation::new("w", vec![1.into()]));
        self.ops.push(Operation::new("m", vec![x1.into(), y.into()]));
        self.ops.push(Operation::new("l", vec![x2.into(), y.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }

    fn finish(mut self) -> Result<Vec<u8>, ReportError> {
        self.show_page();

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::with_capacity(self.pages.len());
        for ops in self.pages {
            let content = Content { operations: ops };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            page_ids.push(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            }));
        }

        let font_id = self.font.add_to(&mut doc);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<Object>>(),
            "Count" => page_ids.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).map_err(lopdf::Error::from)?;
        Ok(buffer)
    }
}

fn draw_counts(canvas: &mut Canvas<'_>, counts: &FieldCounts, y: f32) -> f32 {
    let right = PAGE_WIDTH - MARGIN;
    let rows = top_n(counts, MAX_SECTION_ROWS);

    if rows.is_empty() {
        canvas.text_right(12.0, INK, right, y, NO_DATA);
        return y - 18.0;
    }

    for (i, (label, count)) in rows.iter().enumerate() {
        let line = format!("{label} : {count}");
        canvas.text_right(12.0, INK, right, y - i as f32 * ROW_STEP, &line);
    }
    y - rows.len() as f32 * ROW_STEP - 8.0
}

pub fn render(report: &AggregateReport, font: &FontSource) -> Result<Vec<u8>, ReportError> {
    let mut canvas = Canvas::new(PdfFont::from_source(font));
    let right = PAGE_WIDTH - MARGIN;

    canvas.text_right(18.0, INK, right, PAGE_HEIGHT - 2.2 * CM, TITLE);
    canvas.text_right(
        12.0,
        SUBTLE,
        right,
        PAGE_HEIGHT - 3.1 * CM,
        &format!("الفترة: {}  إلى  {}", report.range.from, report.range.to),
    );
    canvas.text_right(
        12.0,
        SUBTLE,
        right,
        PAGE_HEIGHT - 3.8 * CM,
        &format!("عدد المشاركات: {}", report.total()),
    );

    let mut y = PAGE_HEIGHT - 5.0 * CM;
    for (field, counts) in &report.counts {
        if y < SECTION_BREAK {
            canvas.show_page();
            y = TOP_AFTER_BREAK;
        }

        canvas.text_right(14.0, INK, right, y, field.section_title());
        canvas.rule(RULE, MARGIN, right, y - 6.0);
        y = draw_counts(&mut canvas, counts, y - 22.0);
    }

    canvas.text(10.0, MUTED, MARGIN, 1.6 * CM, FOOTER);

    let pages = canvas.pages.len() + 1;
    let bytes = canvas.finish()?;
    debug!(pages, bytes = bytes.len(), "rendered pdf report");
    Ok(bytes)
}
