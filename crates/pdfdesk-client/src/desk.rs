//! End-to-end operations: pick files, validate, submit, wait, download.

use std::path::Path;

use pdfdesk_core::convert::{execute_single, BatchSelection, ConvertFlow};
use pdfdesk_core::{
    count_pages, request, CompressionLevel, DeskConfig, FileLike, ModuleConstraint, ModuleKind,
    PageLayout, SelectionState, SplitMode, TaskTracker, ValidationError,
};
use tokio_util::sync::CancellationToken;

use crate::client::{Artifact, DeskClient};
use crate::error::ClientError;
use crate::local::LocalFile;
use crate::poll::poll_until_done;

pub struct Desk {
    client: DeskClient,
    config: DeskConfig,
}

impl Desk {
    pub fn new(config: DeskConfig) -> Result<Self, ClientError> {
        let client = DeskClient::new(&config)?;
        Ok(Self { client, config })
    }

    pub fn client(&self) -> &DeskClient {
        &self.client
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn constraint(&self, module: ModuleKind) -> ModuleConstraint {
        ModuleConstraint::for_module(module, &self.config.limits)
    }

    pub fn tracker(&self) -> TaskTracker {
        TaskTracker::new(self.config.poll_policy())
    }

    /// Open `paths` and add them to a fresh store under `module`'s rules.
    /// Skipped and dropped files are logged, not fatal.
    pub async fn select<P: AsRef<Path>>(
        &self,
        module: ModuleKind,
        paths: &[P],
    ) -> Result<SelectionState<LocalFile>, ClientError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(LocalFile::open(path).await?);
        }
        let mut state = SelectionState::new();
        let outcome = state.add_files(files, &self.constraint(module))?;
        for notice in outcome.notices() {
            tracing::warn!(module = %module, "{}", notice);
        }
        Ok(state)
    }

    pub async fn page_count(&self, file: &LocalFile) -> Result<u32, ClientError> {
        let bytes = file.read().await?;
        Ok(count_pages(file.name(), &bytes)?)
    }

    /// Compress every file, polling until the server is done
    pub async fn compress<P, U>(
        &self,
        paths: &[P],
        level: CompressionLevel,
        cancel: &CancellationToken,
        on_update: U,
    ) -> Result<Artifact, ClientError>
    where
        P: AsRef<Path>,
        U: FnMut(&TaskTracker),
    {
        let state = self.select(ModuleKind::Compress, paths).await?;
        let plan = request::compress(&state, &self.constraint(ModuleKind::Compress), Some(level))?;

        let mut tracker = self.tracker();
        self.client.submit_task(&plan, &state, &mut tracker).await?;
        let download_path = poll_until_done(&self.client, &mut tracker, cancel, on_update).await?;

        tokio::time::sleep(self.config.timing.download_delay()).await;
        self.client.download(&download_path).await
    }

    pub async fn merge<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Artifact, ClientError> {
        let state = self.select(ModuleKind::Merge, paths).await?;
        let plan = request::merge(&state, &self.constraint(ModuleKind::Merge))?;
        self.client
            .submit_blob(&plan, &state, &mut self.tracker())
            .await
    }

    /// Split one PDF. Part counts are checked against the local page count.
    pub async fn split(
        &self,
        path: impl AsRef<Path>,
        mode: SplitMode,
    ) -> Result<Artifact, ClientError> {
        let state = self.select(ModuleKind::Split, &[path]).await?;
        let page_count = match (mode, state.first()) {
            (SplitMode::Parts { .. }, Some(file)) => Some(self.page_count(file).await?),
            _ => None,
        };
        let plan = request::split(
            &state,
            &self.constraint(ModuleKind::Split),
            Some(mode),
            page_count,
        )?;
        self.client
            .submit_blob(&plan, &state, &mut self.tracker())
            .await
    }

    /// Reorder and rotate the pages of one PDF. `edit` receives the identity
    /// layout for the document's page count.
    pub async fn organize<E>(&self, path: impl AsRef<Path>, edit: E) -> Result<Artifact, ClientError>
    where
        E: FnOnce(&mut PageLayout) -> Result<(), ValidationError>,
    {
        let state = self.select(ModuleKind::Organize, &[path]).await?;
        let file = state
            .first()
            .ok_or(ValidationError::NoSelection(ModuleKind::Organize))?;
        let mut layout = PageLayout::new(file.key(), self.page_count(file).await?);
        edit(&mut layout)?;

        let plan = request::organize(&state, &self.constraint(ModuleKind::Organize), &layout)?;
        self.client
            .submit_blob(&plan, &state, &mut self.tracker())
            .await
    }

    /// Convert files. Without a target every file becomes a PDF in one
    /// archive; with one, a single file uses the single flow and several
    /// use the batch flow.
    pub async fn convert<P: AsRef<Path>>(
        &self,
        paths: &[P],
        target: Option<&str>,
    ) -> Result<Artifact, ClientError> {
        let state = self.select(ModuleKind::Convert, paths).await?;
        let constraint = self.constraint(ModuleKind::Convert);

        let Some(target) = target else {
            let plan = request::convert_all(&state, &constraint)?;
            return self
                .client
                .submit_blob(&plan, &state, &mut self.tracker())
                .await;
        };

        match ConvertFlow::for_count(state.len()) {
            ConvertFlow::Single => {
                let plan = request::upload_conversion(&state, &constraint)?;
                let upload = self.client.upload_conversion(&plan, &state).await?;
                if upload.is_scanned {
                    tracing::info!(file = %upload.filename, "Scanned document, conversion may be image-only");
                }
                let body = execute_single(&upload, target)?;
                self.client.execute_conversion(&body).await
            }
            ConvertFlow::Batch => {
                let plan = request::upload_conversion_batch(&state, &constraint)?;
                let upload = self.client.upload_conversion_batch(&plan, &state).await?;
                let mut batch = BatchSelection::new(upload);
                for item in batch.items().iter().filter(|i| !i.supported) {
                    tracing::warn!(file = %item.filename, "Unsupported format, skipped");
                }
                let applied = batch.set_all(target);
                tracing::debug!(applied, format = target, "Batch targets chosen");
                let body = batch.execute()?;
                self.client.execute_conversion_batch(&body).await
            }
        }
    }
}
