// PDF assembly for the plate register, built directly on lopdf.
//
// Every page carries the watermark, header, scannable code, footer and its
// slice of the plate grid; the last page also gets the signature line. The
// whole document is built in memory and only returned once complete.

use std::f32::consts::FRAC_1_SQRT_2;

use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument};

use crate::config::ReportSettings;
use crate::error::{ReportError, Result};
use crate::extract::PlateSet;
use crate::fonts::{Face, encode_win_ansi};
use crate::layout::{PageGeometry, PagePlan, plan_pages, split_title};
use crate::qr;
use crate::verification::VerificationRecord;

// Header block, measured down from the top edge
const LOGO_WIDTH: f32 = 55.0;
const LOGO_TOP: f32 = 60.0;
const HEADER_TEXT_INDENT: f32 = 95.0;
const TITLE_LINE_1: f32 = 60.0;
const TITLE_LINE_2: f32 = 78.0;
const META_LINE_1: f32 = 98.0;
const META_LINE_2: f32 = 112.0;
const CODE_SIZE: f32 = 90.0;
const CODE_BOTTOM: f32 = 140.0;

// Footer, measured up from the bottom edge
const PAGE_NUMBER_Y: f32 = 30.0;
const FOOTER_TEXT_Y: f32 = 40.0;
const FOOTER_RULE_Y: f32 = 50.0;
const SIGNATURE_Y: f32 = 80.0;
const SIGNATURE_FROM_RIGHT: f32 = 260.0;

// Font sizes
const WATERMARK_SIZE: f32 = 40.0;
const TITLE_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 9.0;
const FOOTER_SIZE: f32 = 8.0;
const SIGNATURE_SIZE: f32 = 10.0;

type Rgb = (f32, f32, f32);

const BLACK: Rgb = (0.0, 0.0, 0.0);
const DARK_BLUE: Rgb = (0.0, 0.0, 0.545);
const NAVY: Rgb = (0.0, 0.0, 0.502);
const GREY: Rgb = (0.502, 0.502, 0.502);
const LIGHT_GREY: Rgb = (0.827, 0.827, 0.827);
const WATERMARK_GREY: Rgb = (0.92, 0.92, 0.92);
const ROW_SHADE: Rgb = (0.96, 0.96, 0.96);

// XObject resource names.
const CODE_XOBJECT: &str = "Code";
const LOGO_XOBJECT: &str = "Logo";

/// Inputs for one render. Consumed once; nothing is retained afterwards.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub plates: &'a PlateSet,
    pub title: &'a str,
    pub verification: &'a VerificationRecord,
    /// Encoded logo image. Bytes that do not decode fail the render.
    pub logo: Option<&'a [u8]>,
}

#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// `<label>_<YYYY-MM-DD>_<verification id>.pdf`
pub fn file_name(report_label: &str, record: &VerificationRecord) -> String {
    format!(
        "{}_{}_{}.pdf",
        report_label,
        record.date_label(),
        record.identifier
    )
}

struct LogoImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl LogoImage {
    fn decode(bytes: &[u8]) -> Result<Self> {
        let rgba = image::load_from_memory(bytes)
            .map_err(|err| ReportError::Render(format!("logo does not decode: {}", err)))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(ReportError::Render("logo has no pixels".into()));
        }

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }
        let opaque = alpha.iter().all(|&a| a == u8::MAX);

        Ok(Self {
            width,
            height,
            rgb,
            alpha: (!opaque).then_some(alpha),
        })
    }

    fn scaled_height(&self) -> f32 {
        (LOGO_WIDTH * self.height as f32 / self.width as f32).floor()
    }
}

fn image_stream(width: u32, height: u32, color_space: &str, data: Vec<u8>) -> Stream {
    let mut image_dict = Dictionary::new();
    image_dict.set("Type", Object::Name(b"XObject".to_vec()));
    image_dict.set("Subtype", Object::Name(b"Image".to_vec()));
    image_dict.set("Width", Object::Integer(width as i64));
    image_dict.set("Height", Object::Integer(height as i64));
    image_dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    image_dict.set("BitsPerComponent", Object::Integer(8));
    Stream::new(image_dict, data)
}

fn add_code_image(doc: &mut Document, code: RgbImage) -> ObjectId {
    let (width, height) = code.dimensions();
    doc.add_object(image_stream(width, height, "DeviceRGB", code.into_raw()))
}

fn add_logo_image(doc: &mut Document, logo: LogoImage) -> ObjectId {
    let mut stream = image_stream(logo.width, logo.height, "DeviceRGB", logo.rgb);
    if let Some(alpha) = logo.alpha {
        let mask_id = doc.add_object(image_stream(logo.width, logo.height, "DeviceGray", alpha));
        stream.dict.set("SMask", Object::Reference(mask_id));
    }
    doc.add_object(stream)
}

// Operation list for a single page, with small drawing helpers on top.
struct PageCanvas {
    ops: Vec<Operation>,
}

impl PageCanvas {
    fn new() -> Self {
        Self { ops: Vec::new() }
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn save(&mut self) {
        self.op("q", vec![]);
    }

    fn restore(&mut self) {
        self.op("Q", vec![]);
    }

    fn transform(&mut self, m: [f32; 6]) {
        self.op("cm", m.iter().map(|&v| v.into()).collect());
    }

    fn fill(&mut self, (r, g, b): Rgb) {
        self.op("rg", vec![r.into(), g.into(), b.into()]);
    }

    fn stroke(&mut self, (r, g, b): Rgb) {
        self.op("RG", vec![r.into(), g.into(), b.into()]);
    }

    fn text(&mut self, face: Face, size: f32, x: f32, y: f32, text: &str) {
        self.op("BT", vec![]);
        self.op(
            "Tf",
            vec![
                Object::Name(face.resource_name().as_bytes().to_vec()),
                size.into(),
            ],
        );
        self.op("Td", vec![x.into(), y.into()]);
        self.op("Tj", vec![Object::string_literal(encode_win_ansi(text))]);
        self.op("ET", vec![]);
    }

    fn text_centered(&mut self, face: Face, size: f32, cx: f32, y: f32, text: &str) {
        let width = face.text_width(text, size);
        self.text(face, size, cx - width / 2.0, y, text);
    }

    fn text_right(&mut self, face: Face, size: f32, right: f32, y: f32, text: &str) {
        let width = face.text_width(text, size);
        self.text(face, size, right - width, y, text);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.op("re", vec![x.into(), y.into(), w.into(), h.into()]);
        self.op("f", vec![]);
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.op("m", vec![x1.into(), y1.into()]);
        self.op("l", vec![x2.into(), y2.into()]);
        self.op("S", vec![]);
    }

    fn image(&mut self, name: &str, x: f32, y: f32, w: f32, h: f32) {
        self.save();
        self.transform([w, 0.0, 0.0, h, x, y]);
        self.op("Do", vec![Object::Name(name.as_bytes().to_vec())]);
        self.restore();
    }

    fn encode(self) -> Result<Vec<u8>> {
        Ok(Content {
            operations: self.ops,
        }
        .encode()?)
    }
}

struct PageContext<'a> {
    settings: &'a ReportSettings,
    geometry: &'a PageGeometry,
    title_lines: (String, String),
    date_label: String,
    identifier: String,
    logo_height: Option<f32>,
}

impl PageContext<'_> {
    fn draw(&self, plan: &PagePlan) -> PageCanvas {
        let mut canvas = PageCanvas::new();
        self.draw_watermark(&mut canvas);
        self.draw_header(&mut canvas);
        self.draw_footer(&mut canvas, plan);
        self.draw_grid(&mut canvas, plan);
        if plan.is_last() {
            canvas.fill(BLACK);
            canvas.text(
                Face::Regular,
                SIGNATURE_SIZE,
                self.geometry.page_width - SIGNATURE_FROM_RIGHT,
                SIGNATURE_Y,
                &self.settings.signature,
            );
        }
        canvas
    }

    fn draw_watermark(&self, canvas: &mut PageCanvas) {
        let g = self.geometry;
        canvas.save();
        canvas.transform([
            FRAC_1_SQRT_2,
            FRAC_1_SQRT_2,
            -FRAC_1_SQRT_2,
            FRAC_1_SQRT_2,
            g.page_width / 2.0,
            g.page_height / 2.0,
        ]);
        canvas.fill(WATERMARK_GREY);
        canvas.text_centered(Face::Bold, WATERMARK_SIZE, 0.0, 0.0, &self.settings.watermark);
        canvas.restore();
    }

    fn draw_header(&self, canvas: &mut PageCanvas) {
        let g = self.geometry;
        let top = g.page_height;
        let text_x = g.margin_x + HEADER_TEXT_INDENT;

        if let Some(logo_height) = self.logo_height {
            canvas.image(
                LOGO_XOBJECT,
                g.margin_x,
                top - LOGO_TOP - logo_height,
                LOGO_WIDTH,
                logo_height,
            );
        }

        canvas.fill(DARK_BLUE);
        canvas.text(Face::Bold, TITLE_SIZE, text_x, top - TITLE_LINE_1, &self.title_lines.0);
        canvas.text(Face::Bold, TITLE_SIZE, text_x, top - TITLE_LINE_2, &self.title_lines.1);

        canvas.fill(BLACK);
        canvas.text(
            Face::Regular,
            BODY_SIZE,
            text_x,
            top - META_LINE_1,
            &format!("Generated on: {}", self.date_label),
        );
        canvas.text(
            Face::Regular,
            BODY_SIZE,
            text_x,
            top - META_LINE_2,
            &format!("Verification ID: {}", self.identifier),
        );

        canvas.image(
            CODE_XOBJECT,
            g.page_width - g.margin_x - CODE_SIZE,
            top - CODE_BOTTOM,
            CODE_SIZE,
            CODE_SIZE,
        );
    }

    fn draw_footer(&self, canvas: &mut PageCanvas, plan: &PagePlan) {
        let g = self.geometry;
        canvas.fill(DARK_BLUE);
        canvas.text_right(
            Face::Regular,
            BODY_SIZE,
            g.page_width - g.margin_x,
            PAGE_NUMBER_Y,
            &plan.page_label(),
        );

        canvas.stroke(LIGHT_GREY);
        canvas.line(g.margin_x, FOOTER_RULE_Y, g.page_width - g.margin_x, FOOTER_RULE_Y);

        canvas.fill(GREY);
        canvas.text_centered(
            Face::Oblique,
            FOOTER_SIZE,
            g.page_width / 2.0,
            FOOTER_TEXT_Y,
            &self.settings.footer,
        );
    }

    fn draw_grid(&self, canvas: &mut PageCanvas, plan: &PagePlan) {
        let g = self.geometry;
        let column_width = g.column_width();

        for entry in &plan.entries {
            if entry.slot.shaded {
                canvas.fill(ROW_SHADE);
                canvas.fill_rect(
                    entry.x - 2.0,
                    entry.y - g.row_height + 2.0,
                    column_width + 4.0,
                    g.row_height,
                );
            }
            canvas.fill(BLACK);
            canvas.text(Face::Regular, BODY_SIZE, entry.x, entry.y, &entry.text);
        }

        let column_x = g.column_x();
        canvas.stroke(NAVY);
        for &x in &column_x {
            canvas.line(x - 4.0, g.margin_bottom, x - 4.0, g.grid_top() + g.row_height);
        }
        if let Some(&last_x) = column_x.last() {
            let rule_y = g.margin_bottom - 6.0;
            canvas.line(g.margin_x, rule_y, last_x + column_width + 4.0, rule_y);
        }
    }
}

fn font_resources(doc: &mut Document) -> Dictionary {
    let mut fonts = Dictionary::new();
    for face in Face::ALL {
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(face.base_font().as_bytes().to_vec()));
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        let font_id = doc.add_object(font);
        fonts.set(face.resource_name(), Object::Reference(font_id));
    }
    fonts
}

/// Render the register. Fails as a whole: no bytes are produced unless
/// every page was built.
#[instrument(skip_all, fields(plates = request.plates.len(), id = %request.verification.identifier))]
pub fn render_register(
    settings: &ReportSettings,
    request: &RenderRequest<'_>,
) -> Result<RenderedReport> {
    let geometry = &settings.geometry;
    geometry.validate()?;

    // Decode everything fallible before any page is assembled.
    let logo = request.logo.map(LogoImage::decode).transpose()?;
    let code_payload = qr::payload(&settings.department, &settings.locality, request.verification);
    let code = qr::render_code(&code_payload)?;

    let plans = plan_pages(request.plates.as_slice(), geometry);
    let context = PageContext {
        settings,
        geometry,
        title_lines: split_title(request.title),
        date_label: request.verification.date_label(),
        identifier: request.verification.identifier.to_string(),
        logo_height: logo.as_ref().map(LogoImage::scaled_height),
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut xobjects = Dictionary::new();
    let code_id = add_code_image(&mut doc, code);
    xobjects.set(CODE_XOBJECT, Object::Reference(code_id));
    if let Some(logo) = logo {
        let logo_id = add_logo_image(&mut doc, logo);
        xobjects.set(LOGO_XOBJECT, Object::Reference(logo_id));
    }

    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(font_resources(&mut doc)));
    resources.set("XObject", Object::Dictionary(xobjects));
    let resources_id = doc.add_object(resources);

    let media_box = vec![
        0.0f32.into(),
        0.0f32.into(),
        geometry.page_width.into(),
        geometry.page_height.into(),
    ];

    let mut page_ids = Vec::with_capacity(plans.len());
    for plan in &plans {
        let content = context.draw(plan).encode()?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set("MediaBox", media_box.clone());
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Reference(resources_id));
        page_ids.push(doc.add_object(page_dict));

        debug!(page = plan.number, entries = plan.entries.len(), "Page drawn");
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set(
        "Kids",
        Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
    );
    pages_dict.set("Count", Object::Integer(page_ids.len() as i64));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut info_dict = Dictionary::new();
    info_dict.set("Title", Object::string_literal(encode_win_ansi(request.title)));
    info_dict.set(
        "Subject",
        Object::string_literal(format!("Verification ID: {}", context.identifier)),
    );
    info_dict.set("Producer", Object::string_literal("plate-register"));
    let info_id = doc.add_object(info_dict);
    doc.trailer.set("Info", Object::Reference(info_id));

    doc.compress();
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;

    info!(
        pages = page_ids.len(),
        bytes = bytes.len(),
        "Register rendered"
    );
    Ok(RenderedReport {
        bytes,
        page_count: page_ids.len(),
    })
}
