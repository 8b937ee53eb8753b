//! Application model
//!
//! [`ReziApp`] is the form: two upload slots, a prompt, the credit balance,
//! the latest result and the single visible error message. Front-ends drive it
//! through these operations and render its getters.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::config::ReziConfig;
use crate::encoded_image::EncodedImage;
use crate::error::ReziError;
use crate::exporter::{
    FileSaver, ImageClipboard, NativeShare, ResultExporter, ShareOutcome, ShareStatus,
};
use crate::ingestion::{FileSelection, ImageSlot, PreviewRegistry};
use crate::ledger::{CreditLedger, CreditStore};
use crate::orchestrator::{
    validate_preconditions, GenerationInputs, GenerationOrchestrator, RequestLifecycleState,
};
use crate::progress::ProgressPresenter;
use crate::provider::ImageGenerator;

pub const CHILDHOOD_TITLE: &str = "Childhood Photo";
pub const CURRENT_TITLE: &str = "Current Photo";

/// Platform services the app talks to.
pub struct Collaborators {
    pub store: Arc<dyn CreditStore>,
    pub generator: Arc<dyn ImageGenerator>,
    pub saver: Arc<dyn FileSaver>,
    pub native_share: Arc<dyn NativeShare>,
    pub clipboard: Arc<dyn ImageClipboard>,
}

pub struct ReziApp {
    previews: PreviewRegistry,
    childhood: ImageSlot,
    current: ImageSlot,
    prompt: String,
    ledger: CreditLedger,
    orchestrator: GenerationOrchestrator,
    exporter: ResultExporter,
    result: Option<EncodedImage>,
    error: Option<String>,
}

impl ReziApp {
    pub fn new(
        ledger: CreditLedger,
        orchestrator: GenerationOrchestrator,
        exporter: ResultExporter,
        default_prompt: impl Into<String>,
    ) -> Self {
        let previews = PreviewRegistry::new();
        Self {
            childhood: ImageSlot::new(CHILDHOOD_TITLE, previews.clone()),
            current: ImageSlot::new(CURRENT_TITLE, previews.clone()),
            previews,
            prompt: default_prompt.into(),
            ledger,
            orchestrator,
            exporter,
            result: None,
            error: None,
        }
    }

    /// Wire the app from configuration. Opens the ledger (initialising it on first run).
    pub fn from_config(config: &ReziConfig, parts: Collaborators) -> Result<Self, ReziError> {
        let app = &config.app;
        let ledger = CreditLedger::open(parts.store, app.initial_credits)?;
        let presenter = ProgressPresenter::with_interval(std::time::Duration::from_millis(
            app.fact_interval_ms,
        ));
        let orchestrator =
            GenerationOrchestrator::with_cost(parts.generator, presenter, app.generation_cost);
        let exporter = ResultExporter::new(parts.saver, parts.native_share, parts.clipboard)
            .with_prefix(app.download_prefix.clone())
            .with_reset_delay(std::time::Duration::from_millis(app.share_reset_ms));
        Ok(Self::new(ledger, orchestrator, exporter, app.default_prompt.clone()))
    }

    pub async fn select_childhood(&mut self, selection: FileSelection) -> bool {
        self.childhood.ingest(selection).await.is_some()
    }

    pub async fn select_current(&mut self, selection: FileSelection) -> bool {
        self.current.ingest(selection).await.is_some()
    }

    pub fn childhood(&self) -> &ImageSlot {
        &self.childhood
    }

    pub fn current(&self) -> &ImageSlot {
        &self.current
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn credits(&self) -> u32 {
        self.ledger.read()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&EncodedImage> {
        self.result.as_ref()
    }

    pub fn lifecycle(&self) -> RequestLifecycleState {
        self.orchestrator.lifecycle()
    }

    pub fn generation_cost(&self) -> u32 {
        self.orchestrator.cost()
    }

    pub fn share_status(&self) -> ShareStatus {
        self.exporter.share_status()
    }

    pub fn is_share_enabled(&self) -> bool {
        self.result.is_some() && self.exporter.is_share_enabled()
    }

    pub fn facts(&self) -> &[String] {
        self.orchestrator.presenter().facts()
    }

    pub fn current_fact(&self) -> Option<&str> {
        self.orchestrator.presenter().current_fact()
    }

    /// Index of the fact on screen; changes only while a request is in flight.
    pub fn progress_updates(&self) -> watch::Receiver<usize> {
        self.orchestrator.presenter().subscribe()
    }

    fn inputs(&self) -> GenerationInputs<'_> {
        GenerationInputs {
            childhood: self.childhood.image(),
            current: self.current.image(),
            prompt: &self.prompt,
        }
    }

    /// Whether the generate control is enabled.
    pub fn can_generate(&self) -> bool {
        self.inputs().is_complete()
            && self.orchestrator.is_trigger_enabled()
            && self.ledger.can_afford(self.orchestrator.cost())
    }

    /// Run one generation attempt and fold the outcome into the form.
    pub async fn generate(&mut self) -> Result<&EncodedImage, ReziError> {
        if let Err(e) = validate_preconditions(
            self.inputs(),
            self.ledger.balance(),
            self.orchestrator.cost(),
        ) {
            debug!(error = %e, "Generate rejected");
            self.error = Some(e.to_string());
            return Err(e);
        }

        self.error = None;
        self.result = None;

        let inputs = GenerationInputs {
            childhood: self.childhood.image(),
            current: self.current.image(),
            prompt: &self.prompt,
        };
        match self.orchestrator.generate(inputs, &mut self.ledger).await {
            Ok(image) => Ok(&*self.result.insert(image)),
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Save the current result. Returns false when there is nothing to save.
    pub fn download(&self) -> bool {
        match &self.result {
            Some(result) => {
                self.exporter.download(result);
                true
            }
            None => false,
        }
    }

    /// Suggested file name of the current result.
    pub fn download_name(&self) -> Option<String> {
        self.result.as_ref().map(|r| self.exporter.file_name(r))
    }

    /// Share the current result. A dismissed share sheet leaves no message.
    pub async fn share(&mut self) -> Result<ShareOutcome, ReziError> {
        let Some(result) = self.result.as_ref() else {
            return Err(ReziError::NoResult);
        };
        match self.exporter.share(result).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
