//! Minimal PDF writer: one page per image, each page a single full-bleed
//! JPEG XObject.
//!
//! Baseline and progressive 8-bit JPEGs are embedded byte-for-byte with
//! `/DCTDecode`. Everything else (PNG, WebP, CMYK JPEG) is decoded with
//! `image`, flattened onto white and re-encoded as JPEG.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, GenericImageView, Rgb, RgbImage};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use super::{EncodeError, PageEncoder};

/// Page width in points; heights follow each image's aspect ratio.
const DEFAULT_PAGE_WIDTH_PT: f32 = 720.0;

/// Quality used when a page has to be re-encoded.
const DEFAULT_JPEG_QUALITY: u8 = 95;

const PDF_HEADER: &[u8] = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n";

/// Object numbers 1 and 2 are the catalog and page tree; each page then
/// takes three: page, content stream, image.
const OBJECTS_PER_PAGE: usize = 3;
const FIRST_PAGE_OBJECT: usize = 3;

/// PDF encoder with a fixed page width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfEncoder {
    page_width_pt: f32,
    jpeg_quality: u8,
}

impl Default for PdfEncoder {
    fn default() -> Self {
        Self {
            page_width_pt: DEFAULT_PAGE_WIDTH_PT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl PdfEncoder {
    /// Creates an encoder with 720pt pages and quality-95 re-encoding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn load_page(&self, path: &Path) -> Result<PageImage, EncodeError> {
        let bytes = std::fs::read(path).map_err(|e| EncodeError::io(path, e))?;

        if let Some(info) = jpeg_info(&bytes) {
            if info.embeddable() {
                return Ok(PageImage {
                    width: info.width,
                    height: info.height,
                    color_space: if info.components == 1 {
                        "/DeviceGray"
                    } else {
                        "/DeviceRGB"
                    },
                    data: bytes,
                });
            }
        }

        let decoded = image::load_from_memory(&bytes).map_err(|e| EncodeError::decode(path, e))?;
        let rgb = flatten_onto_white(&decoded);
        let (width, height) = rgb.dimensions();

        let mut data = Vec::new();
        JpegEncoder::new_with_quality(&mut data, self.jpeg_quality)
            .encode(&rgb, width, height, ExtendedColorType::Rgb8)
            .map_err(|e| EncodeError::decode(path, e))?;
        debug!(path = %path.display(), width, height, "re-encoded page as JPEG");

        Ok(PageImage {
            width,
            height,
            color_space: "/DeviceRGB",
            data,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn page_height_pt(&self, page: &PageImage) -> f32 {
        if page.width == 0 {
            return self.page_width_pt;
        }
        page.height as f32 * self.page_width_pt / page.width as f32
    }

    fn render(&self, pages: &[PageImage]) -> Vec<u8> {
        let mut writer = PdfWriter::new();

        let kids = (0..pages.len())
            .map(|i| format!("{} 0 R", FIRST_PAGE_OBJECT + i * OBJECTS_PER_PAGE))
            .collect::<Vec<_>>()
            .join(" ");

        writer.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");
        writer.object(
            2,
            format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()).as_bytes(),
        );

        for (i, page) in pages.iter().enumerate() {
            let page_obj = FIRST_PAGE_OBJECT + i * OBJECTS_PER_PAGE;
            let content_obj = page_obj + 1;
            let image_obj = page_obj + 2;
            let width = self.page_width_pt;
            let height = self.page_height_pt(page);

            writer.object(
                page_obj,
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {width:.2} {height:.2}] \
                     /Resources << /XObject << /Im0 {image_obj} 0 R >> >> \
                     /Contents {content_obj} 0 R >>"
                )
                .as_bytes(),
            );

            let content = format!("q {width:.2} 0 0 {height:.2} 0 0 cm /Im0 Do Q");
            writer.stream(content_obj, "", content.as_bytes());

            let dict = format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} \
                 /BitsPerComponent 8 /Filter /DCTDecode",
                page.width, page.height, page.color_space
            );
            writer.stream(image_obj, &dict, &page.data);
        }

        writer.finish(1)
    }
}

impl PageEncoder for PdfEncoder {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    #[instrument(skip(self, pages, output), fields(pages = pages.len(), output = %output.display()))]
    fn encode(&self, pages: &[PathBuf], output: &Path) -> Result<(), EncodeError> {
        if pages.is_empty() {
            return Err(EncodeError::NoPages {
                output: output.to_path_buf(),
            });
        }

        let images = pages
            .iter()
            .map(|path| self.load_page(path))
            .collect::<Result<Vec<_>, _>>()?;
        let document = self.render(&images);

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| EncodeError::io(dir, e))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| EncodeError::io(dir, e))?;
        temp.write_all(&document)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| EncodeError::io(temp.path(), e))?;
        temp.persist(output).map_err(|e| EncodeError::Persist {
            path: output.to_path_buf(),
            source: e.error,
        })?;

        debug!(bytes = document.len(), "document written");
        Ok(())
    }
}

struct PageImage {
    width: u32,
    height: u32,
    color_space: &'static str,
    data: Vec<u8>,
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let (width, height) = image.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            // Exact for a in {0, 255}; result never exceeds 255.
            let value = (c * a + 255 * (255 - a) + 127) / 255;
            u8::try_from(value).unwrap_or(u8::MAX)
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Frame header fields of a JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegInfo {
    width: u32,
    height: u32,
    components: u8,
    precision: u8,
}

impl JpegInfo {
    fn embeddable(self) -> bool {
        self.precision == 8
            && matches!(self.components, 1 | 3)
            && self.width > 0
            && self.height > 0
    }
}

/// Reads the SOF header of a JPEG, or `None` if `bytes` is not a JPEG.
fn jpeg_info(bytes: &[u8]) -> Option<JpegInfo> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }

    let mut pos = 2;
    loop {
        while *bytes.get(pos)? != 0xFF {
            pos += 1;
        }
        while *bytes.get(pos)? == 0xFF {
            pos += 1;
        }
        let marker = *bytes.get(pos)?;
        pos += 1;

        match marker {
            0xD8 | 0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => return None,
            _ => {}
        }

        let length = usize::from(u16::from_be_bytes([*bytes.get(pos)?, *bytes.get(pos + 1)?]));
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            let segment = bytes.get(pos + 2..pos + 8)?;
            return Some(JpegInfo {
                precision: segment[0],
                height: u32::from(u16::from_be_bytes([segment[1], segment[2]])),
                width: u32::from(u16::from_be_bytes([segment[3], segment[4]])),
                components: segment[5],
            });
        }
        pos += length;
    }
}

/// Accumulates numbered objects and their byte offsets.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl PdfWriter {
    fn new() -> Self {
        Self {
            buf: PDF_HEADER.to_vec(),
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, number: usize, body: &[u8]) {
        self.offsets.push((number, self.buf.len()));
        self.buf
            .extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, number: usize, dict_entries: &str, data: &[u8]) {
        let mut body = Vec::with_capacity(data.len() + 128);
        let separator = if dict_entries.is_empty() { "" } else { " " };
        body.extend_from_slice(
            format!(
                "<< {dict_entries}{separator}/Length {} >>\nstream\n",
                data.len()
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.object(number, &body);
    }

    fn finish(mut self, root: usize) -> Vec<u8> {
        self.offsets.sort_unstable();
        let size = self.offsets.last().map_or(1, |(n, _)| n + 1);
        let xref_offset = self.buf.len();

        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        let mut expected = 1;
        for &(number, offset) in &self.offsets {
            // Unused numbers are listed as free entries.
            while expected < number {
                xref.push_str("0000000000 65535 f \n");
                expected += 1;
            }
            let _ = writeln!(xref, "{offset:010} 00000 n ");
            expected += 1;
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {size} /Root {root} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        );

        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}
