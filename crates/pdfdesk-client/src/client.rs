//! HTTP client for the desk backend

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use pdfdesk_core::api::{
    attachment_name, BatchUpload, ConversionUpload, ErrorBody, ExecuteBatch, ExecuteConversion,
};
use pdfdesk_core::request::ResolvedValue;
use pdfdesk_core::{
    DeskConfig, DeskError, Endpoint, FileLike, FormPlan, ProgressReport, ReplyKind,
    SelectionState, SubmitReply, TaskTracker,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::local::LocalFile;
use crate::poll::ProgressSource;

/// A file returned by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Write into `dir` under the artifact's own name
    pub async fn save_in(&self, dir: impl AsRef<Path>) -> std::io::Result<PathBuf> {
        let name = Path::new(&self.file_name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "download".into());
        let path = dir.as_ref().join(name);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}

#[derive(Debug, Clone)]
pub struct DeskClient {
    http: Client,
    base_url: String,
}

impl DeskClient {
    pub fn new(config: &DeskConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timing.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        endpoint.url(&self.base_url)
    }

    async fn form(
        &self,
        plan: &FormPlan,
        state: &SelectionState<LocalFile>,
    ) -> Result<Form, ClientError> {
        let mut form = Form::new();
        for (name, value) in plan.resolve(state)? {
            form = match value {
                ResolvedValue::Text(text) => form.text(name.to_string(), text.to_string()),
                ResolvedValue::File(file) => {
                    let part = Part::bytes(file.read().await?)
                        .file_name(file.name().to_string())
                        .mime_str(file.mime_type())?;
                    form.part(name.to_string(), part)
                }
            };
        }
        Ok(form)
    }

    /// Send a plan and return the successful response
    async fn send_plan(
        &self,
        plan: &FormPlan,
        state: &SelectionState<LocalFile>,
    ) -> Result<Response, ClientError> {
        let form = self.form(plan, state).await?;
        let url = self.url(&plan.endpoint);
        tracing::info!(url = %url, fields = plan.fields.len(), "Submitting");
        let response = self.http.post(&url).multipart(form).send().await?;
        checked(response).await
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| DeskError::from(e).into())
    }

    /// Submit a task-creating plan and move `tracker` into polling
    pub async fn submit_task(
        &self,
        plan: &FormPlan,
        state: &SelectionState<LocalFile>,
        tracker: &mut TaskTracker,
    ) -> Result<String, ClientError> {
        expect_reply(plan, ReplyKind::Task)?;
        tracker.begin_submit()?;
        let reply: Result<SubmitReply, ClientError> = async {
            let response = self.send_plan(plan, state).await?;
            Self::json(response).await
        }
        .await;
        match reply {
            Ok(reply) => Ok(tracker.accept_reply(reply)?),
            Err(e) => {
                tracker.fail(e.to_string());
                Err(e)
            }
        }
    }

    /// Submit a plan answered with the artifact itself
    pub async fn submit_blob(
        &self,
        plan: &FormPlan,
        state: &SelectionState<LocalFile>,
        tracker: &mut TaskTracker,
    ) -> Result<Artifact, ClientError> {
        let default_name = match plan.reply {
            ReplyKind::Blob { default_name } => default_name,
            other => {
                return Err(DeskError::InvalidState(format!(
                    "{} does not answer with a file ({:?})",
                    plan.endpoint.path(),
                    other
                ))
                .into())
            }
        };
        tracker.begin_submit()?;
        let result = async {
            let response = self.send_plan(plan, state).await?;
            artifact(response, default_name).await
        }
        .await;
        match result {
            Ok(artifact) => {
                tracker.finish_direct(format!("Ready: {}", artifact.file_name))?;
                Ok(artifact)
            }
            Err(e) => {
                tracker.fail(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn upload_conversion(
        &self,
        plan: &FormPlan,
        state: &SelectionState<LocalFile>,
    ) -> Result<ConversionUpload, ClientError> {
        expect_reply(plan, ReplyKind::Json)?;
        let response = self.send_plan(plan, state).await?;
        Self::json(response).await
    }

    pub async fn upload_conversion_batch(
        &self,
        plan: &FormPlan,
        state: &SelectionState<LocalFile>,
    ) -> Result<BatchUpload, ClientError> {
        expect_reply(plan, ReplyKind::Json)?;
        let response = self.send_plan(plan, state).await?;
        Self::json(response).await
    }

    pub async fn execute_conversion(
        &self,
        body: &ExecuteConversion,
    ) -> Result<Artifact, ClientError> {
        let response = self
            .http
            .post(self.url(&Endpoint::ExecuteConversion))
            .json(body)
            .send()
            .await?;
        let default_name = format!("converted.{}", body.target_format);
        artifact(checked(response).await?, &default_name).await
    }

    pub async fn execute_conversion_batch(
        &self,
        body: &ExecuteBatch,
    ) -> Result<Artifact, ClientError> {
        let response = self
            .http
            .post(self.url(&Endpoint::ExecuteConversionBatch))
            .json(body)
            .send()
            .await?;
        artifact(checked(response).await?, "converted_files.zip").await
    }

    /// Fetch a finished artifact, e.g. the path from `PollStep::Complete`
    pub async fn download(&self, path: &str) -> Result<Artifact, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::info!(url = %url, "Downloading");
        let response = self.http.get(&url).send().await?;
        artifact(checked(response).await?, "compressed.zip").await
    }
}

#[async_trait]
impl ProgressSource for DeskClient {
    async fn progress(&self, task_id: &str) -> Result<ProgressReport, DeskError> {
        let request = async {
            let response = self
                .http
                .get(self.url(&Endpoint::Progress(task_id.to_string())))
                .send()
                .await?;
            Self::json::<ProgressReport>(checked(response).await?).await
        };
        request.await.map_err(ClientError::into_desk)
    }
}

fn expect_reply(plan: &FormPlan, kind: ReplyKind) -> Result<(), DeskError> {
    if plan.reply != kind {
        return Err(DeskError::InvalidState(format!(
            "{} answers with {:?}, not {:?}",
            plan.endpoint.path(),
            plan.reply,
            kind
        )));
    }
    Ok(())
}

/// Turn non-2xx responses into `DeskError::Server` with the body's message
async fn checked(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    let fallback = status
        .canonical_reason()
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    Err(DeskError::Server {
        status: status.as_u16(),
        message: ErrorBody::message_or(&body, &fallback),
    }
    .into())
}

async fn artifact(response: Response, default_name: &str) -> Result<Artifact, ClientError> {
    let file_name = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(attachment_name)
        .unwrap_or_else(|| default_name.to_string());
    let bytes = response.bytes().await?.to_vec();
    tracing::debug!(file = %file_name, size = bytes.len(), "Artifact received");
    Ok(Artifact { file_name, bytes })
}
