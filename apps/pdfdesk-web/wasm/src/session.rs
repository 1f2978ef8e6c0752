//! Stateful desk session
//!
//! Holds the selection store, panels, page layout and task tracker in Rust.
//! JavaScript forwards DOM events and draws the preview model it gets back.
//!
//! Async methods share the state through `Rc<RefCell<_>>` and never hold a
//! borrow across an `await`, so the page may keep calling into the session
//! (e.g. `cancel`) while a submission is polling.

use std::cell::RefCell;
use std::rc::Rc;

use pdfdesk_core::api::{ConversionUpload, SubmitReply};
use pdfdesk_core::convert::execute_single;
use pdfdesk_core::{
    count_pages, CompressionLevel, DeskConfig, DeskError, Endpoint, FileKey, FileLike,
    ModuleKind, PageLayout, PollStep, ProgressReport, ReplyKind, SplitMode,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::browser_file::BrowserFile;
use crate::desk_state::DeskState;
use crate::fetch;

struct Shared {
    desk: DeskState<BrowserFile>,
    on_progress: Option<js_sys::Function>,
    on_reset: Option<js_sys::Function>,
}

#[derive(Serialize)]
struct AddReport {
    added: usize,
    duplicates: usize,
    unsupported: usize,
    truncated: usize,
    notices: Vec<String>,
}

#[derive(Serialize)]
struct DecodeJob {
    token: u32,
    name: String,
    size: u64,
}

#[derive(Serialize)]
struct PanelOffset {
    module: ModuleKind,
    menu_id: &'static str,
    right: &'static str,
}

#[derive(Serialize)]
struct SubmitResult {
    phase: &'static str,
    status: String,
    file_name: Option<String>,
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_module(name: &str) -> Result<ModuleKind, JsValue> {
    name.parse().map_err(|e: String| JsValue::from_str(&e))
}

fn key(name: &str, size: f64) -> FileKey {
    FileKey::new(name, size as u64)
}

/// Browser session over the shared selection store
#[wasm_bindgen]
pub struct DeskSession {
    shared: Rc<RefCell<Shared>>,
}

#[wasm_bindgen]
impl DeskSession {
    /// Create a session for `module`. `config` takes the same shape as the
    /// TOML configuration; omitted fields use defaults and an omitted
    /// `base_url` means same-origin requests.
    #[wasm_bindgen(constructor)]
    pub fn new(module: &str, config: JsValue) -> Result<DeskSession, JsValue> {
        let module = parse_module(module)?;
        let config = if config.is_undefined() || config.is_null() {
            DeskConfig {
                base_url: String::new(),
                ..DeskConfig::default()
            }
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?
        };
        config.validate().map_err(js_err)?;
        Ok(Self {
            shared: Rc::new(RefCell::new(Shared {
                desk: DeskState::new(module, config),
                on_progress: None,
                on_reset: None,
            })),
        })
    }

    #[wasm_bindgen(getter)]
    pub fn module(&self) -> String {
        self.shared.borrow().desk.module().to_string()
    }

    #[wasm_bindgen(js_name = setModule)]
    pub fn set_module(&self, module: &str) -> Result<(), JsValue> {
        let module = parse_module(module)?;
        self.shared.borrow_mut().desk.set_module(module);
        Ok(())
    }

    /// Callback signature: (percent: number, status: string, phase: string) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&self, callback: js_sys::Function) {
        self.shared.borrow_mut().on_progress = Some(callback);
    }

    /// Called with no arguments once a finished task has reset the session
    #[wasm_bindgen(js_name = setResetCallback)]
    pub fn set_reset_callback(&self, callback: js_sys::Function) {
        self.shared.borrow_mut().on_reset = Some(callback);
    }

    // ---- selection ----

    /// Add picked or dropped files. Pass `Array.from(input.files)`.
    #[wasm_bindgen(js_name = addFiles)]
    pub fn add_files(&self, files: js_sys::Array) -> Result<JsValue, JsValue> {
        let files = files
            .iter()
            .map(|v| v.dyn_into::<web_sys::File>().map(BrowserFile::new))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| JsValue::from_str("addFiles expects an array of File objects"))?;

        let outcome = self
            .shared
            .borrow_mut()
            .desk
            .add_files(files)
            .map_err(js_err)?;
        let notices = outcome.notices();
        for notice in &notices {
            web_sys::console::warn_1(&JsValue::from_str(notice));
        }
        to_js(&AddReport {
            added: outcome.added.len(),
            duplicates: outcome.duplicates.len(),
            unsupported: outcome.unsupported.len(),
            truncated: outcome.truncated.len(),
            notices,
        })
    }

    /// Returns whether the store is now empty
    #[wasm_bindgen(js_name = removeFile)]
    pub fn remove_file(&self, name: &str, size: f64) -> Result<bool, JsValue> {
        self.shared
            .borrow_mut()
            .desk
            .remove(&key(name, size))
            .map(|r| r.emptied)
            .ok_or_else(|| JsValue::from_str(&format!("{} is not selected", name)))
    }

    /// `order` lists current indices in the desired new order
    #[wasm_bindgen(js_name = reorderFiles)]
    pub fn reorder_files(&self, order: &[usize]) -> Result<(), JsValue> {
        self.shared
            .borrow_mut()
            .desk
            .reorder_by_indices(order)
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = sortByName)]
    pub fn sort_by_name(&self, ascending: bool) {
        self.shared.borrow_mut().desk.sort_by_name(ascending);
    }

    #[wasm_bindgen(js_name = focusFile)]
    pub fn focus_file(&self, name: &str, size: f64) -> bool {
        self.shared.borrow_mut().desk.focus(&key(name, size))
    }

    #[wasm_bindgen(js_name = fileCount)]
    pub fn file_count(&self) -> usize {
        self.shared.borrow().desk.selection.len()
    }

    // ---- page counts ----

    /// Page counts to compute with the page's own renderer. Report each
    /// with `finishDecode` or `failDecode`.
    #[wasm_bindgen(js_name = startDecodes)]
    pub fn start_decodes(&self) -> Result<JsValue, JsValue> {
        let jobs: Vec<DecodeJob> = self
            .shared
            .borrow_mut()
            .desk
            .start_decodes()
            .into_iter()
            .map(|(token, key)| DecodeJob {
                token,
                name: key.name,
                size: key.size,
            })
            .collect();
        to_js(&jobs)
    }

    /// Returns false when the file was removed while decoding
    #[wasm_bindgen(js_name = finishDecode)]
    pub fn finish_decode(&self, token: u32, pages: u32) -> bool {
        self.shared.borrow_mut().desk.finish_decode(token, Ok(pages))
    }

    #[wasm_bindgen(js_name = failDecode)]
    pub fn fail_decode(&self, token: u32, message: &str) -> bool {
        self.shared
            .borrow_mut()
            .desk
            .finish_decode(token, Err(message.to_string()))
    }

    /// Count pages in Rust for every file still missing a count. Returns
    /// how many results were applied.
    #[wasm_bindgen(js_name = decodePending)]
    pub async fn decode_pending(&self) -> Result<u32, JsValue> {
        let jobs: Vec<(u32, Option<BrowserFile>)> = {
            let mut shared = self.shared.borrow_mut();
            let started = shared.desk.start_decodes();
            let jobs = started
                .into_iter()
                .map(|(token, key)| (token, shared.desk.selection.get(&key).cloned()))
                .collect();
            jobs
        };

        let mut applied = 0;
        for (token, file) in jobs {
            let Some(file) = file else { continue };
            let result = if !file.is_pdf() {
                Err("Not a PDF".to_string())
            } else {
                match file.bytes().await {
                    Ok(bytes) => count_pages(file.name(), &bytes).map_err(|e| e.to_string()),
                    Err(e) => Err(format!("{:?}", e)),
                }
            };
            if self.shared.borrow_mut().desk.finish_decode(token, result) {
                applied += 1;
            }
        }
        Ok(applied)
    }

    // ---- preview and options ----

    /// View model for the active module
    pub fn preview(&self) -> Result<JsValue, JsValue> {
        to_js(&self.shared.borrow().desk.preview())
    }

    #[wasm_bindgen(js_name = setCompressionLevel)]
    pub fn set_compression_level(&self, level: &str) -> Result<(), JsValue> {
        let level: CompressionLevel = level.parse().map_err(|e: String| JsValue::from_str(&e))?;
        self.shared.borrow_mut().desk.set_compression_level(level);
        Ok(())
    }

    #[wasm_bindgen(js_name = setSplitParts)]
    pub fn set_split_parts(&self, parts: u32) {
        self.shared
            .borrow_mut()
            .desk
            .set_split_mode(SplitMode::Parts { parts });
    }

    #[wasm_bindgen(js_name = setSplitSize)]
    pub fn set_split_size(&self, max_size_mb: f64) {
        self.shared
            .borrow_mut()
            .desk
            .set_split_mode(SplitMode::Size { max_size_mb });
    }

    // ---- organize ----

    #[wasm_bindgen(js_name = movePage)]
    pub fn move_page(&self, from: usize, to: usize) -> Result<(), JsValue> {
        self.with_layout(|l| l.move_slot(from, to))?.map_err(js_err)
    }

    #[wasm_bindgen(js_name = reorderPages)]
    pub fn reorder_pages(&self, pages: &[u32]) -> Result<(), JsValue> {
        self.with_layout(|l| l.reorder(pages))?.map_err(js_err)
    }

    /// Returns the page's new rotation
    #[wasm_bindgen(js_name = rotatePage)]
    pub fn rotate_page(&self, page: u32) -> Result<u16, JsValue> {
        self.with_layout(|l| l.rotate(page))?
            .ok_or_else(|| JsValue::from_str(&format!("No page {}", page)))
    }

    #[wasm_bindgen(js_name = rotateSelected)]
    pub fn rotate_selected(&self) -> Result<Vec<u32>, JsValue> {
        self.with_layout(|l| l.rotate_selected())?.map_err(js_err)
    }

    #[wasm_bindgen(js_name = togglePage)]
    pub fn toggle_page(&self, page: u32) -> Result<bool, JsValue> {
        self.with_layout(|l| l.toggle_selected(page))?
            .ok_or_else(|| JsValue::from_str(&format!("No page {}", page)))
    }

    #[wasm_bindgen(js_name = selectAllPages)]
    pub fn select_all_pages(&self) -> Result<(), JsValue> {
        self.with_layout(|l| l.select_all())
    }

    #[wasm_bindgen(js_name = clearPageSelection)]
    pub fn clear_page_selection(&self) -> Result<usize, JsValue> {
        self.with_layout(|l| l.clear_selection())?.map_err(js_err)
    }

    /// A thumbnail scrolled into view; true the first time, when it should
    /// be rendered
    #[wasm_bindgen(js_name = pageVisible)]
    pub fn page_visible(&self, page: u32) -> Result<bool, JsValue> {
        self.with_layout(|l| l.mark_visible(page))
    }

    // ---- panels ----

    /// Open a module's panel, closing any other. Returns the closed panel.
    #[wasm_bindgen(js_name = openPanel)]
    pub fn open_panel(&self, module: &str) -> Result<Option<String>, JsValue> {
        let module = parse_module(module)?;
        let closed = self
            .shared
            .borrow_mut()
            .desk
            .open_panel(module)
            .map_err(js_err)?;
        Ok(closed.map(|m| m.to_string()))
    }

    #[wasm_bindgen(js_name = closePanel)]
    pub fn close_panel(&self, module: &str) -> Result<bool, JsValue> {
        let module = parse_module(module)?;
        Ok(self.shared.borrow_mut().desk.menus.close(module))
    }

    #[wasm_bindgen(js_name = closeAllPanels)]
    pub fn close_all_panels(&self) {
        self.shared.borrow_mut().desk.menus.close_all();
    }

    #[wasm_bindgen(js_name = panelOffsets)]
    pub fn panel_offsets(&self) -> Result<JsValue, JsValue> {
        let offsets: Vec<PanelOffset> = self
            .shared
            .borrow()
            .desk
            .menus
            .offsets()
            .into_iter()
            .map(|(module, right)| PanelOffset {
                module,
                menu_id: module.menu_id(),
                right,
            })
            .collect();
        to_js(&offsets)
    }

    // ---- task ----

    #[wasm_bindgen(js_name = canSubmit)]
    pub fn can_submit(&self) -> bool {
        self.shared.borrow().desk.tracker.can_submit()
    }

    pub fn phase(&self) -> String {
        self.shared.borrow().desk.tracker.phase().name().to_string()
    }

    pub fn status(&self) -> String {
        self.shared.borrow().desk.tracker.status().to_string()
    }

    pub fn percent(&self) -> f32 {
        self.shared.borrow().desk.tracker.percent()
    }

    /// Advance the smoothed progress bar; call from `requestAnimationFrame`
    #[wasm_bindgen(js_name = tickProgress)]
    pub fn tick_progress(&self) -> f32 {
        self.shared.borrow_mut().desk.tracker.tick_progress()
    }

    /// Fail the running task. Replies still in flight for it are dropped.
    pub fn cancel(&self) {
        self.shared.borrow_mut().desk.cancel_task();
        self.notify();
    }

    pub fn reset(&self) {
        self.shared.borrow_mut().desk.reset();
    }

    /// Submit the active module. Compression polls until done and then
    /// downloads; merge, split and organize download the returned file;
    /// convert uploads and resolves with the offered target formats.
    pub async fn submit(&self) -> Result<JsValue, JsValue> {
        let (plan, form, base) = {
            let shared = self.shared.borrow();
            let plan = shared.desk.plan().map_err(js_err)?;
            let form = fetch::form_data(&plan, &shared.desk.selection).map_err(js_err)?;
            (plan, form, shared.desk.config().base_url.clone())
        };
        let url = plan.endpoint.url(&base);

        match plan.reply {
            ReplyKind::Json => self.upload_for_conversion(&plan.endpoint, &url, &form).await,
            ReplyKind::Task => {
                let ticket = self.begin()?;
                let reply = match fetch::post_form(&url, &form).await {
                    Ok(r) => fetch::json::<SubmitReply>(r).await,
                    Err(e) => Err(e),
                };
                let accepted = reply.and_then(|r| {
                    self.current(ticket)?;
                    self.shared.borrow_mut().desk.tracker.accept_reply(r)
                });
                if let Err(e) = accepted {
                    return Err(self.failed(ticket, e));
                }
                self.notify();
                let download_path = match self.poll(&base, ticket).await {
                    Ok(path) => path,
                    Err(e) => return Err(self.failed(ticket, e)),
                };
                let download_url = format!("{}{}", base.trim_end_matches('/'), download_path);
                self.finish_with_navigation(ticket, &download_url).await
            }
            ReplyKind::Blob { default_name } => {
                let ticket = self.begin()?;
                let result = match fetch::post_form(&url, &form).await {
                    Ok(r) => fetch::save_blob(r, default_name).await,
                    Err(e) => Err(e),
                };
                self.finish_blob(ticket, result).await
            }
        }
    }

    /// Single flow: convert the uploaded file to one of its offered formats
    #[wasm_bindgen(js_name = executeConversion)]
    pub async fn execute_conversion(&self, target: &str) -> Result<JsValue, JsValue> {
        let (body, base) = {
            let shared = self.shared.borrow();
            let upload = shared
                .desk
                .upload
                .as_ref()
                .ok_or_else(|| JsValue::from_str("Upload the file first"))?;
            let body = execute_single(upload, target).map_err(js_err)?;
            (body, shared.desk.config().base_url.clone())
        };
        let ticket = self.begin()?;
        let default_name = format!("converted.{}", body.target_format);
        let result = match fetch::post_json(&Endpoint::ExecuteConversion.url(&base), &body).await {
            Ok(r) => fetch::save_blob(r, &default_name).await,
            Err(e) => Err(e),
        };
        self.finish_blob(ticket, result).await
    }

    /// Batch flow: choose the target for one file, by task id or file name
    #[wasm_bindgen(js_name = setBatchTarget)]
    pub fn set_batch_target(&self, file: &str, target: &str) -> Result<(), JsValue> {
        let mut shared = self.shared.borrow_mut();
        let batch = shared
            .desk
            .batch
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Upload the files first"))?;
        batch.set_target(file, target).map_err(js_err)
    }

    /// Batch flow: apply one target wherever it is offered
    #[wasm_bindgen(js_name = setAllTargets)]
    pub fn set_all_targets(&self, target: &str) -> Result<usize, JsValue> {
        let mut shared = self.shared.borrow_mut();
        let batch = shared
            .desk
            .batch
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Upload the files first"))?;
        Ok(batch.set_all(target))
    }

    #[wasm_bindgen(js_name = executeConversionBatch)]
    pub async fn execute_conversion_batch(&self) -> Result<JsValue, JsValue> {
        let (body, base) = {
            let shared = self.shared.borrow();
            let batch = shared
                .desk
                .batch
                .as_ref()
                .ok_or_else(|| JsValue::from_str("Upload the files first"))?;
            (
                batch.execute().map_err(js_err)?,
                shared.desk.config().base_url.clone(),
            )
        };
        let ticket = self.begin()?;
        let url = Endpoint::ExecuteConversionBatch.url(&base);
        let result = match fetch::post_json(&url, &body).await {
            Ok(r) => fetch::save_blob(r, "converted_files.zip").await,
            Err(e) => Err(e),
        };
        self.finish_blob(ticket, result).await
    }

    /// Convert every selected file to PDF in one archive
    #[wasm_bindgen(js_name = convertAll)]
    pub async fn convert_all(&self) -> Result<JsValue, JsValue> {
        let (plan, form, base) = {
            let shared = self.shared.borrow();
            let plan = shared.desk.convert_all_plan().map_err(js_err)?;
            let form = fetch::form_data(&plan, &shared.desk.selection).map_err(js_err)?;
            (plan, form, shared.desk.config().base_url.clone())
        };
        let ReplyKind::Blob { default_name } = plan.reply else {
            return Err(JsValue::from_str("convert_all must answer with a file"));
        };
        let ticket = self.begin()?;
        let result = match fetch::post_form(&plan.endpoint.url(&base), &form).await {
            Ok(r) => fetch::save_blob(r, default_name).await,
            Err(e) => Err(e),
        };
        self.finish_blob(ticket, result).await
    }
}

// Private helpers, not exported to JavaScript
impl DeskSession {
    fn with_layout<T>(&self, f: impl FnOnce(&mut PageLayout) -> T) -> Result<T, JsValue> {
        let mut shared = self.shared.borrow_mut();
        let layout = shared
            .desk
            .layout
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Pages are still loading"))?;
        Ok(f(layout))
    }

    fn begin(&self) -> Result<u64, JsValue> {
        let ticket = self
            .shared
            .borrow_mut()
            .desk
            .begin_task()
            .map_err(js_err)?;
        self.notify();
        Ok(ticket)
    }

    /// Checked after every await: a cancel or reset in between retires the
    /// ticket and the task's loop must leave the tracker alone
    fn current(&self, ticket: u64) -> Result<(), DeskError> {
        if self.shared.borrow().desk.is_current(ticket) {
            Ok(())
        } else {
            Err(DeskError::TaskFailed("Cancelled".to_string()))
        }
    }

    fn failed(&self, ticket: u64, e: DeskError) -> JsValue {
        if self.current(ticket).is_ok() {
            web_sys::console::error_1(&format!("Submission failed: {}", e).into());
            self.shared.borrow_mut().desk.tracker.fail(e.to_string());
            self.notify();
        }
        js_err(e)
    }

    fn notify(&self) {
        let (callback, percent, status, phase) = {
            let shared = self.shared.borrow();
            let tracker = &shared.desk.tracker;
            (
                shared.on_progress.clone(),
                tracker.percent(),
                tracker.status().to_string(),
                tracker.phase().name(),
            )
        };
        if let Some(callback) = callback {
            if let Err(e) = callback.call3(
                &JsValue::NULL,
                &JsValue::from_f64(percent as f64),
                &JsValue::from_str(&status),
                &JsValue::from_str(phase),
            ) {
                web_sys::console::error_1(&e);
            }
        }
    }

    async fn upload_for_conversion(
        &self,
        endpoint: &Endpoint,
        url: &str,
        form: &web_sys::FormData,
    ) -> Result<JsValue, JsValue> {
        let response = fetch::post_form(url, form).await.map_err(js_err)?;
        if *endpoint == Endpoint::UploadConversionBatch {
            let upload = fetch::json(response).await.map_err(js_err)?;
            let mut shared = self.shared.borrow_mut();
            let batch = shared.desk.accept_batch(upload);
            to_js(batch.items())
        } else {
            let upload: ConversionUpload = fetch::json(response).await.map_err(js_err)?;
            if let Some(message) = &upload.message {
                web_sys::console::log_1(&JsValue::from_str(message));
            }
            let value = to_js(&upload)?;
            self.shared.borrow_mut().desk.upload = Some(upload);
            Ok(value)
        }
    }

    async fn poll(&self, base: &str, ticket: u64) -> Result<String, DeskError> {
        let (task_id, policy) = {
            let shared = self.shared.borrow();
            let tracker = &shared.desk.tracker;
            let task_id = tracker
                .task_id()
                .ok_or_else(|| DeskError::InvalidState("No task to poll".to_string()))?
                .to_string();
            (task_id, tracker.policy().clone())
        };
        let url = Endpoint::Progress(task_id.clone()).url(base);
        let started = js_sys::Date::now();

        loop {
            fetch::sleep(policy.interval).await?;
            self.current(ticket)?;

            let elapsed = std::time::Duration::from_millis((js_sys::Date::now() - started) as u64);
            let step = self.shared.borrow_mut().desk.tracker.check_deadline(elapsed);
            if let PollStep::Stop { message } = step {
                self.notify();
                return Err(DeskError::TaskFailed(message));
            }

            let result = match fetch::get(&url).await {
                Ok(r) => fetch::json::<ProgressReport>(r).await,
                Err(e) => Err(e),
            };
            self.current(ticket)?;
            let step = {
                let mut shared = self.shared.borrow_mut();
                match result {
                    Ok(report) => shared.desk.tracker.observe(&task_id, report),
                    Err(e) => shared.desk.tracker.poll_error(&task_id, &e),
                }
            };
            self.notify();

            match step {
                PollStep::Continue => continue,
                PollStep::Complete { download_path } => return Ok(download_path),
                PollStep::Stop { message } => return Err(DeskError::TaskFailed(message)),
                PollStep::Ignored => {
                    return Err(DeskError::TaskFailed("Task is no longer running".to_string()))
                }
            }
        }
    }

    async fn finish_with_navigation(
        &self,
        ticket: u64,
        download_url: &str,
    ) -> Result<JsValue, JsValue> {
        let timing = self.shared.borrow().desk.config().timing.clone();
        fetch::sleep(timing.download_delay()).await.map_err(js_err)?;
        self.current(ticket).map_err(js_err)?;
        fetch::navigate(download_url).map_err(js_err)?;
        let result = self.result(None);
        self.schedule_reset(ticket, timing.reset_delay()).await?;
        result
    }

    async fn finish_blob(
        &self,
        ticket: u64,
        result: Result<String, DeskError>,
    ) -> Result<JsValue, JsValue> {
        let file_name = match result.and_then(|name| self.current(ticket).map(|_| name)) {
            Ok(name) => name,
            Err(e) => return Err(self.failed(ticket, e)),
        };
        self.shared
            .borrow_mut()
            .desk
            .tracker
            .finish_direct(format!("Downloaded {}", file_name))
            .map_err(js_err)?;
        self.notify();
        let result = self.result(Some(file_name));
        let delay = self.shared.borrow().desk.config().timing.reset_delay();
        self.schedule_reset(ticket, delay).await?;
        result
    }

    fn result(&self, file_name: Option<String>) -> Result<JsValue, JsValue> {
        let shared = self.shared.borrow();
        to_js(&SubmitResult {
            phase: shared.desk.tracker.phase().name(),
            status: shared.desk.tracker.status().to_string(),
            file_name,
        })
    }

    async fn schedule_reset(&self, ticket: u64, delay: std::time::Duration) -> Result<(), JsValue> {
        fetch::sleep(delay).await.map_err(js_err)?;
        if self.current(ticket).is_err() {
            return Ok(());
        }
        let callback = {
            let mut shared = self.shared.borrow_mut();
            shared.desk.reset();
            shared.on_reset.clone()
        };
        if let Some(callback) = callback {
            if let Err(e) = callback.call0(&JsValue::NULL) {
                web_sys::console::error_1(&e);
            }
        }
        Ok(())
    }
}
