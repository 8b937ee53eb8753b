//! Generation orchestration
//!
//! Validates the form, dispatches exactly one request to the [`ImageGenerator`],
//! and folds the outcome into the request lifecycle. The ledger is threaded in
//! explicitly and debited only after the service returns an image, before the
//! success becomes visible.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::encoded_image::EncodedImage;
use crate::error::ReziError;
use crate::ledger::{CreditBalance, CreditLedger, GENERATION_COST};
use crate::progress::ProgressPresenter;
use crate::provider::{GenerationRequest, ImageGenerator};

/// Status of the current generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestLifecycleState {
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

impl RequestLifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestLifecycleState::Idle => "idle",
            RequestLifecycleState::InFlight => "in_flight",
            RequestLifecycleState::Succeeded => "succeeded",
            RequestLifecycleState::Failed => "failed",
        }
    }
}

/// What the form currently holds.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInputs<'a> {
    pub childhood: Option<&'a EncodedImage>,
    pub current: Option<&'a EncodedImage>,
    pub prompt: &'a str,
}

impl GenerationInputs<'_> {
    pub fn is_complete(&self) -> bool {
        self.childhood.is_some() && self.current.is_some() && !self.prompt.trim().is_empty()
    }
}

/// Check preconditions in order (inputs first, then credit) and build the request.
pub fn validate_preconditions(
    inputs: GenerationInputs<'_>,
    balance: CreditBalance,
    cost: u32,
) -> Result<GenerationRequest, ReziError> {
    let (Some(childhood), Some(current)) = (inputs.childhood, inputs.current) else {
        return Err(ReziError::MissingInput);
    };
    let prompt = inputs.prompt.trim();
    if prompt.is_empty() {
        return Err(ReziError::MissingInput);
    }
    if !balance.covers(cost) {
        return Err(ReziError::InsufficientCredit {
            balance: balance.value(),
            required: cost,
        });
    }
    Ok(GenerationRequest {
        childhood_image: childhood.clone(),
        current_image: current.clone(),
        prompt: prompt.to_string(),
    })
}

/// Marks a request in flight for as long as it lives. If the request future is
/// dropped before resolving, the lifecycle falls back to idle.
struct InFlight<'a> {
    state: &'a mut RequestLifecycleState,
}

impl<'a> InFlight<'a> {
    fn enter(state: &'a mut RequestLifecycleState) -> Self {
        *state = RequestLifecycleState::InFlight;
        Self { state }
    }

    fn resolve(self, outcome: RequestLifecycleState) {
        *self.state = outcome;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if *self.state == RequestLifecycleState::InFlight {
            *self.state = RequestLifecycleState::Idle;
        }
    }
}

pub struct GenerationOrchestrator {
    generator: Arc<dyn ImageGenerator>,
    presenter: ProgressPresenter,
    cost: u32,
    lifecycle: RequestLifecycleState,
}

impl GenerationOrchestrator {
    pub fn new(generator: Arc<dyn ImageGenerator>, presenter: ProgressPresenter) -> Self {
        Self::with_cost(generator, presenter, GENERATION_COST)
    }

    pub fn with_cost(
        generator: Arc<dyn ImageGenerator>,
        presenter: ProgressPresenter,
        cost: u32,
    ) -> Self {
        Self {
            generator,
            presenter,
            cost,
            lifecycle: RequestLifecycleState::Idle,
        }
    }

    pub fn lifecycle(&self) -> RequestLifecycleState {
        self.lifecycle
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn presenter(&self) -> &ProgressPresenter {
        &self.presenter
    }

    /// The trigger is disabled while a request is in flight.
    pub fn is_trigger_enabled(&self) -> bool {
        self.lifecycle != RequestLifecycleState::InFlight
    }

    /// Run one generation attempt.
    ///
    /// Precondition failures return before anything is dispatched and leave the
    /// lifecycle as it was. Otherwise the service is called once; on success the
    /// ledger is debited by the cost and the image returned, on failure the
    /// ledger is untouched.
    pub async fn generate(
        &mut self,
        inputs: GenerationInputs<'_>,
        ledger: &mut CreditLedger,
    ) -> Result<EncodedImage, ReziError> {
        if self.lifecycle == RequestLifecycleState::InFlight {
            return Err(ReziError::GenerationInFlight);
        }
        let request = validate_preconditions(inputs, ledger.balance(), self.cost)?;

        let flight = InFlight::enter(&mut self.lifecycle);
        let _progress = self.presenter.start();
        info!(
            provider = self.generator.provider_name(),
            model = self.generator.model_name(),
            balance = ledger.read(),
            "Generation dispatched"
        );

        let outcome = match self.generator.generate(&request).await {
            Ok(image) => ledger.debit(self.cost).map(|balance| (image, balance)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok((image, balance)) => {
                flight.resolve(RequestLifecycleState::Succeeded);
                info!(
                    media_type = image.media_type(),
                    balance = balance.value(),
                    "Generation succeeded"
                );
                Ok(image)
            }
            Err(e) => {
                flight.resolve(RequestLifecycleState::Failed);
                warn!(error = %e, "Generation failed");
                Err(e)
            }
        }
    }
}
