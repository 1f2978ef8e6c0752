//! WASM bindings for the PDF desk
//!
//! State lives in Rust behind `DeskSession`; JavaScript forwards DOM events
//! and renders the preview model.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { DeskSession } from './pkg/pdfdesk_wasm.js';
//!
//! await init();
//!
//! const session = new DeskSession("compress");
//! session.setProgressCallback((percent, status, phase) => updateBar(percent, status));
//! session.setResetCallback(() => render(session.preview()));
//!
//! const report = session.addFiles(Array.from(input.files));
//! report.notices.forEach(showToast);
//! session.setCompressionLevel("ebook");
//! render(session.preview());
//! await session.submit();
//!
//! // Organize: count pages, then edit the layout
//! const organize = new DeskSession("organize");
//! organize.addFiles([file]);
//! await organize.decodePending();
//! organize.movePage(0, 2);
//! organize.rotatePage(3);
//! await organize.submit();
//! ```

pub mod browser_file;
pub mod desk_state;
pub mod fetch;
pub mod session;

use wasm_bindgen::prelude::*;

pub use browser_file::BrowserFile;
pub use desk_state::DeskState;
pub use session::DeskSession;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Page count of a PDF, without a session
#[wasm_bindgen]
pub fn get_page_count(name: &str, bytes: &[u8]) -> Result<u32, JsValue> {
    pdfdesk_core::count_pages(name, bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Format bytes as human-readable string
#[wasm_bindgen]
pub fn format_bytes(bytes: f64) -> String {
    pdfdesk_core::format_bytes(bytes.max(0.0) as u64)
}

/// Size in megabytes as shown on file cards
#[wasm_bindgen]
pub fn format_mb(bytes: f64) -> String {
    pdfdesk_core::format_mb(bytes.max(0.0) as u64)
}
