//! PDF text and image extraction using lopdf and pdf-extract.

use std::panic::{AssertUnwindSafe, catch_unwind};

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, trace, warn};

use super::{PdfProcessor, Result};
use crate::error::PdfError;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    /// Create an extractor with `data` already loaded.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut extractor = Self::new();
        extractor.load(data)?;
        Ok(extractor)
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or(PdfError::Parse("No document loaded".to_string()))
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.document()?
            .get_pages()
            .get(&page)
            .copied()
            .ok_or(PdfError::InvalidPage(page))
    }

    fn try_extract_image_from_object(&self, doc: &Document, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

        trace!("Found image object: {}x{}", width, height);

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()),
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    trace!("Decoding JPEG image");
                    let jpeg = decoded_content(stream, true)?;
                    return image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg).ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Unsupported image filter {:?}", filter_name.map(String::from_utf8_lossy));
                    return None;
                }
                _ => {}
            }
        }

        let data = decoded_content(stream, false).unwrap_or_else(|| stream.content.clone());

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceGray");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8) as u8;

        create_image_from_raw(&data, width, height, color_space, bits)
    }

    /// Resources dictionary of a page, following `Parent` inheritance.
    fn get_page_resources(&self, doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
        let Object::Dictionary(dict) = doc.get_object(node_id).ok()? else {
            return None;
        };

        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
                return Some(res_dict.clone());
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.get_page_resources(doc, *parent_id),
            _ => None,
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract needs the decrypted bytes
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        // pdf-extract panics on some documents lopdf loads fine, e.g. a
        // missing MediaBox.
        match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(&self.raw_data))) {
            Ok(result) => result.map_err(|e| PdfError::TextExtraction(e.to_string())),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!("pdf-extract panicked: {}", reason);
                Err(PdfError::TextExtraction(format!("pdf-extract panicked: {}", reason)))
            }
        }
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        let doc = self.document()?;
        self.page_id(page)?;

        doc.extract_text(&[page])
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn render_page(&self, page: u32) -> Result<DynamicImage> {
        // A scanned page is one large image; logos and stamps are smaller.
        self.extract_images(page)?
            .into_iter()
            .max_by_key(|img| img.width() as u64 * img.height() as u64)
            .ok_or(PdfError::NoPageImage(page))
    }

    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>> {
        let doc = self.document()?;
        let page_id = self.page_id(page)?;

        let mut images = Vec::new();

        if let Some(resources) = self.get_page_resources(doc, page_id) {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                    for (_name, obj_ref) in xobj_dict.iter() {
                        if let Ok((_, obj)) = doc.dereference(obj_ref) {
                            if let Some(img) = self.try_extract_image_from_object(doc, obj) {
                                images.push(img);
                            }
                        }
                    }
                }
            }
        }

        debug!("Extracted {} images from page {}", images.len(), page);
        Ok(images)
    }
}

/// Stream data with its filters undone. With `keep_codec` the last filter
/// (an image codec such as DCTDecode) is left in place.
fn decoded_content(stream: &Stream, keep_codec: bool) -> Option<Vec<u8>> {
    let mut filters: Vec<Object> = match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![Object::Name(name.clone())],
        Ok(Object::Array(filters)) => filters.clone(),
        _ => return Some(stream.content.clone()),
    };
    if keep_codec {
        filters.pop();
    }
    if filters.is_empty() {
        return Some(stream.content.clone());
    }

    let parms = match stream.dict.get(b"DecodeParms") {
        Ok(Object::Array(parms)) => parms.first().cloned(),
        Ok(parms) => Some(parms.clone()),
        Err(_) => None,
    };

    // Plain copy without the image entries so lopdf runs the filters.
    let mut plain = Stream::new(Dictionary::new(), stream.content.clone());
    plain.dict.set("Filter", Object::Array(filters));
    if let Some(parms @ Object::Dictionary(_)) = parms {
        plain.dict.set("DecodeParms", parms);
    }

    match plain.decompressed_content() {
        Ok(data) => Some(data),
        Err(e) => {
            trace!("Could not undo stream filters: {}", e);
            None
        }
    }
}

fn create_image_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: u8,
) -> Option<DynamicImage> {
    trace!(
        "Creating image from raw data: {}x{}, colorspace={:?}, bits={}",
        width,
        height,
        String::from_utf8_lossy(color_space),
        bits_per_component
    );

    let pixels = width as usize * height as usize;
    let is_gray = color_space == b"DeviceGray" || color_space == b"G" || color_space == b"CalGray";
    let is_rgb = color_space == b"DeviceRGB" || color_space == b"RGB" || color_space == b"CalRGB";

    match (bits_per_component, is_gray, is_rgb) {
        (8, true, _) if data.len() >= pixels => {
            GrayImage::from_raw(width, height, data[..pixels].to_vec()).map(DynamicImage::ImageLuma8)
        }
        (8, _, true) if data.len() >= pixels * 3 => {
            RgbImage::from_raw(width, height, data[..pixels * 3].to_vec()).map(DynamicImage::ImageRgb8)
        }
        (1, true, _) => {
            // Rows are padded to a whole byte.
            let row_bytes = (width as usize).div_ceil(8);
            if data.len() < row_bytes * height as usize {
                return None;
            }
            let mut gray = Vec::with_capacity(pixels);
            for row in data.chunks(row_bytes).take(height as usize) {
                for x in 0..width as usize {
                    let bit = (row[x / 8] >> (7 - x % 8)) & 1;
                    gray.push(if bit == 1 { 255 } else { 0 });
                }
            }
            GrayImage::from_raw(width, height, gray).map(DynamicImage::ImageLuma8)
        }
        _ => {
            trace!("Could not decode image: data_len={}, pixels={}", data.len(), pixels);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Stream, dictionary};
    use pretty_assertions::assert_eq;

    /// Uncompressed 8-bit gray image XObject.
    fn gray_image(width: u32, height: u32) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![200u8; (width * height) as usize],
        )
    }

    /// One page with a text line and, optionally, an image XObject.
    fn build_pdf(text: Option<&str>, image: Option<Stream>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        let mut operations = Vec::new();

        if let Some(text) = text {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ]);
        }

        if let Some(image) = image {
            let image_id = doc.add_object(image);
            resources.set("XObject", dictionary! { "Im1" => image_id });
            operations.push(Operation::new("Do", vec!["Im1".into()]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let resources_id = doc.add_object(resources);

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(matches!(
            PdfExtractor::from_bytes(b"definitely not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_page_text_layer() {
        let extractor = PdfExtractor::from_bytes(&build_pdf(Some("CNP 1234567890123"), None)).unwrap();

        assert_eq!(extractor.page_count(), 1);
        let text = extractor.extract_page_text(1).unwrap();
        assert!(text.contains("CNP 1234567890123"), "got {:?}", text);
        assert!(matches!(extractor.extract_page_text(2), Err(PdfError::InvalidPage(2))));
    }

    #[test]
    fn test_render_page_uses_embedded_scan() {
        let extractor = PdfExtractor::from_bytes(&build_pdf(None, Some(gray_image(6, 4)))).unwrap();

        let page = extractor.render_page(1).unwrap();
        assert_eq!((page.width(), page.height()), (6, 4));
    }

    #[test]
    fn test_render_page_flate_wrapped_jpeg() {
        let mut jpeg = Vec::new();
        DynamicImage::ImageLuma8(GrayImage::from_pixel(256, 256, image::Luma([180])))
            .write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 256,
                "Height" => 256,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            jpeg,
        );
        stream.compress().unwrap();
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");
        stream.dict.set(
            "Filter",
            vec![Object::Name(b"FlateDecode".to_vec()), Object::Name(b"DCTDecode".to_vec())],
        );

        let extractor = PdfExtractor::from_bytes(&build_pdf(None, Some(stream))).unwrap();

        let page = extractor.render_page(1).unwrap();
        assert_eq!((page.width(), page.height()), (256, 256));
    }

    #[test]
    fn test_extract_text_survives_missing_media_box() {
        let mut doc = Document::load_mem(&build_pdf(None, Some(gray_image(8, 8)))).unwrap();
        let pages_id = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
        doc.get_object_mut(pages_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .remove(b"MediaBox");
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let extractor = PdfExtractor::from_bytes(&bytes).unwrap();

        assert!(matches!(extractor.extract_text(), Err(PdfError::TextExtraction(_))));
        assert_eq!(extractor.render_page(1).unwrap().width(), 8);
    }

    #[test]
    fn test_render_page_without_image() {
        let extractor = PdfExtractor::from_bytes(&build_pdf(Some("text only"), None)).unwrap();
        assert!(matches!(extractor.render_page(1), Err(PdfError::NoPageImage(1))));
    }

    #[test]
    fn test_one_bit_gray_rows_are_padded() {
        // 3 pixels wide: each row is one byte, high bits first.
        let image = create_image_from_raw(&[0b1010_0000, 0b0100_0000], 3, 2, b"DeviceGray", 1).unwrap();
        let gray = image.to_luma8();

        assert_eq!(gray.as_raw(), &vec![255, 0, 255, 0, 255, 0]);
    }
}
