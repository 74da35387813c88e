//! Cucumber world: per-scenario state handed to every step.

use crate::lifecycle::ScenarioLifecycle;
use crate::result::{ProbeError, ProbeResult};
use crate::steps::StepVocabulary;
use crate::todo_page::TodoPage;
use cucumber::World;
use futures::future::{FutureExt, LocalBoxFuture};
use std::sync::Arc;
use std::time::Instant;

/// State of one scenario.
///
/// The runner's `before` hook installs the lifecycle manager and vocabulary;
/// a world fresh from [`Default`] has neither.
#[derive(Debug, Default, World)]
pub struct TodoWorld {
    /// Owner of the scenario's browser resources
    pub lifecycle: Option<ScenarioLifecycle>,
    /// Shared step table
    pub vocabulary: Option<Arc<StepVocabulary>>,
    /// Text of the first failure
    pub last_error: Option<String>,
    /// When the scenario began
    pub started: Option<Instant>,
}

impl TodoWorld {
    /// The page of the running scenario
    ///
    /// # Errors
    ///
    /// [`ProbeError::InvalidState`] before the `before` hook has run.
    pub fn page(&self) -> ProbeResult<&TodoPage> {
        self.lifecycle
            .as_ref()
            .ok_or_else(|| ProbeError::invalid_state("scenario has no lifecycle manager"))?
            .page()
    }

    /// Record `error` as the scenario's failure, keeping the first one
    pub fn record_error(&mut self, error: &ProbeError) {
        if self.last_error.is_none() {
            self.last_error = Some(error.to_string());
        }
    }

    async fn run_step(&self, text: &str, table: Option<&[Vec<String>]>) -> ProbeResult<()> {
        let vocabulary = self
            .vocabulary
            .as_ref()
            .ok_or_else(|| ProbeError::invalid_state("scenario has no step vocabulary"))?;
        vocabulary.execute(self.page()?, text, table).await
    }
}

/// Step entry point registered with cucumber for every vocabulary pattern.
///
/// Errors are recorded on the world, then raised as a panic, which is how
/// cucumber learns a step failed.
pub fn dispatch(world: &mut TodoWorld, ctx: cucumber::step::Context) -> LocalBoxFuture<'_, ()> {
    async move {
        let table = ctx.step.table.as_ref().map(|t| t.rows.as_slice());
        if let Err(e) = world.run_step(&ctx.step.value, table).await {
            world.record_error(&e);
            panic!("{e}");
        }
    }
    .boxed_local()
}
