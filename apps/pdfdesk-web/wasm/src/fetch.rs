//! `fetch` plumbing for the session
//!
//! Every helper returns `DeskError` so the task tracker can classify
//! failures: a rejected `fetch` promise is a transport error, a non-2xx
//! response is a server error carrying the body's message.

use std::time::Duration;

use js_sys::Promise;
use pdfdesk_core::api::{attachment_name, ErrorBody};
use pdfdesk_core::request::ResolvedValue;
use pdfdesk_core::{DeskError, FileLike, FormPlan, SelectionState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, FormData, HtmlAnchorElement, Request, RequestInit, Response, Url};

use crate::browser_file::BrowserFile;

fn describe(e: &JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{:?}", e))
}

fn transport(e: JsValue) -> DeskError {
    DeskError::Transport(describe(&e))
}

fn browser(e: JsValue) -> DeskError {
    DeskError::InvalidState(describe(&e))
}

fn window() -> Result<web_sys::Window, DeskError> {
    web_sys::window().ok_or_else(|| DeskError::InvalidState("No window".to_string()))
}

/// Multipart body for a plan. Must be built while the store is borrowed.
pub fn form_data(
    plan: &FormPlan,
    state: &SelectionState<BrowserFile>,
) -> Result<FormData, DeskError> {
    let form = FormData::new().map_err(browser)?;
    for (name, value) in plan.resolve(state)? {
        let appended = match value {
            ResolvedValue::Text(text) => form.append_with_str(name, text),
            ResolvedValue::File(file) => {
                form.append_with_blob_and_filename(name, file.file(), file.name())
            }
        };
        appended.map_err(browser)?;
    }
    Ok(form)
}

async fn send(method: &str, url: &str, body: Option<&JsValue>, json: bool) -> Result<Response, DeskError> {
    let opts = RequestInit::new();
    opts.set_method(method);
    if let Some(body) = body {
        opts.set_body(body);
    }
    let request = Request::new_with_str_and_init(url, &opts).map_err(browser)?;
    if json {
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(browser)?;
    }

    let response = JsFuture::from(window()?.fetch_with_request(&request))
        .await
        .map_err(transport)?;
    let response: Response = response.dyn_into().map_err(browser)?;
    if response.ok() {
        return Ok(response);
    }

    let body = match response.text() {
        Ok(p) => JsFuture::from(p)
            .await
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default(),
        Err(_) => String::new(),
    };
    let fallback = match response.status_text() {
        t if t.is_empty() => format!("HTTP {}", response.status()),
        t => t,
    };
    Err(DeskError::Server {
        status: response.status(),
        message: ErrorBody::message_or(body.as_bytes(), &fallback),
    })
}

pub async fn post_form(url: &str, form: &FormData) -> Result<Response, DeskError> {
    send("POST", url, Some(form.as_ref()), false).await
}

pub async fn post_json<T: Serialize>(url: &str, body: &T) -> Result<Response, DeskError> {
    let body = serde_json::to_string(body)?;
    send("POST", url, Some(&JsValue::from_str(&body)), true).await
}

pub async fn get(url: &str) -> Result<Response, DeskError> {
    send("GET", url, None, false).await
}

pub async fn json<T: DeserializeOwned>(response: Response) -> Result<T, DeskError> {
    let text = JsFuture::from(response.text().map_err(browser)?)
        .await
        .map_err(transport)?
        .as_string()
        .unwrap_or_default();
    Ok(serde_json::from_str(&text)?)
}

/// Save the response body through a temporary object URL. Returns the
/// file name used.
pub async fn save_blob(response: Response, default_name: &str) -> Result<String, DeskError> {
    let name = response
        .headers()
        .get("content-disposition")
        .ok()
        .flatten()
        .and_then(|h| attachment_name(&h))
        .unwrap_or_else(|| default_name.to_string());

    let blob: Blob = JsFuture::from(response.blob().map_err(browser)?)
        .await
        .map_err(transport)?
        .dyn_into()
        .map_err(browser)?;
    let url = Url::create_object_url_with_blob(&blob).map_err(browser)?;

    let document = window()?
        .document()
        .ok_or_else(|| DeskError::InvalidState("No document".to_string()))?;
    let anchor: HtmlAnchorElement = document
        .create_element("a")
        .map_err(browser)?
        .dyn_into()
        .map_err(|e: web_sys::Element| browser(e.into()))?;
    anchor.set_href(&url);
    anchor.set_download(&name);
    anchor.click();
    Url::revoke_object_url(&url).map_err(browser)?;
    Ok(name)
}

/// Let the browser download `url` itself
pub fn navigate(url: &str) -> Result<(), DeskError> {
    window()?.location().set_href(url).map_err(browser)
}

/// Resolve after `duration` on the page's timer
pub async fn sleep(duration: Duration) -> Result<(), DeskError> {
    let window = window()?;
    let millis = duration.as_millis().min(i32::MAX as u128) as i32;
    let promise = Promise::new(&mut |resolve, reject| {
        if let Err(e) =
            window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
        {
            let _ = reject.call1(&JsValue::NULL, &e);
        }
    });
    JsFuture::from(promise).await.map(|_| ()).map_err(browser)
}
