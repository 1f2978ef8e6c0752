//! `File` objects from an `<input type="file">` or a drop

use pdfdesk_core::file::{extension_of, mime_for_extension};
use pdfdesk_core::FileLike;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[derive(Debug, Clone)]
pub struct BrowserFile {
    file: web_sys::File,
    name: String,
    size: u64,
    mime_type: String,
}

impl BrowserFile {
    pub fn new(file: web_sys::File) -> Self {
        let name = file.name();
        // Browsers report "" for types they do not know
        let mime_type = match file.type_() {
            t if t.is_empty() => mime_for_extension(&extension_of(&name)).to_string(),
            t => t,
        };
        Self {
            size: file.size() as u64,
            name,
            mime_type,
            file,
        }
    }

    pub fn file(&self) -> &web_sys::File {
        &self.file
    }

    pub async fn bytes(&self) -> Result<Vec<u8>, JsValue> {
        let buffer = JsFuture::from(self.file.array_buffer()).await?;
        Ok(js_sys::Uint8Array::new(&buffer).to_vec())
    }
}

impl FileLike for BrowserFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }
}
