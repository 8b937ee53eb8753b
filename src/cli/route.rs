//! CLI route: single route table and run context. Dispatches to the app model and presentation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::app::{Collaborators, ReziApp};
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_credits, format_facts, format_generation_summary, format_share_outcome,
};
use crate::config::{ConfigLoader, ReziConfig};
use crate::error::ReziError;
use crate::exporter::{DirectorySaver, ImageClipboard, NoNativeShare, SaveAnchor};
use crate::ingestion::FileSelection;
use crate::ledger::{CreditLedger, CreditStore, SledCreditStore};
use crate::progress::NOSTALGIA_FACTS;
use crate::provider::GeminiClient;

/// Runtime context for CLI execution, built from the optional config path using ConfigLoader only.
pub struct RunContext {
    config: ReziConfig,
}

impl RunContext {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ReziError> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(&path)?,
            None => ConfigLoader::load()?,
        };
        Ok(Self { config })
    }

    pub fn from_config(config: ReziConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReziConfig {
        &self.config
    }

    fn open_store(&self) -> Result<Arc<dyn CreditStore>, ReziError> {
        let path = self.config.storage.credits_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "Opening credit store");
        Ok(Arc::new(SledCreditStore::open(&path)?))
    }

    /// Execute a command and return the text to print.
    pub async fn execute(&self, command: &Commands) -> Result<String, ReziError> {
        match command {
            Commands::Credits { format } => {
                let ledger = CreditLedger::open(self.open_store()?, self.config.app.initial_credits)?;
                format_credits(ledger.read(), self.config.app.generation_cost, format)
            }
            Commands::Generate {
                childhood,
                current,
                prompt,
                out,
                share,
            } => {
                self.handle_generate(childhood, current, prompt.as_deref(), out.as_deref(), *share)
                    .await
            }
            Commands::Facts => Ok(format_facts(
                &NOSTALGIA_FACTS
                    .iter()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>(),
            )),
            Commands::Config => self.config.to_redacted_toml(),
        }
    }

    async fn handle_generate(
        &self,
        childhood: &Path,
        current: &Path,
        prompt: Option<&str>,
        out: Option<&Path>,
        share: bool,
    ) -> Result<String, ReziError> {
        let out_dir = out
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.app.resolve_download_dir());
        let saver = DirectorySaver::new(&out_dir);

        let mut app = ReziApp::from_config(
            &self.config,
            Collaborators {
                store: self.open_store()?,
                generator: Arc::new(GeminiClient::from_config(&self.config.provider)?),
                saver: Arc::new(DirectorySaver::new(&out_dir)),
                native_share: Arc::new(NoNativeShare),
                clipboard: system_clipboard(),
            },
        )?;

        app.select_childhood(FileSelection::from_picker(Some(childhood.to_path_buf())))
            .await;
        app.select_current(FileSelection::from_picker(Some(current.to_path_buf())))
            .await;
        if let Some(prompt) = prompt {
            app.set_prompt(prompt);
        }

        let facts = app.facts().to_vec();
        let updates = app.progress_updates();
        let ticker = tokio::spawn(async move {
            eprintln!("Crafting your moment...");
            relay_facts(facts, updates, |fact| eprintln!("  {}", fact)).await;
        });
        let generated = app.generate().await.map(|_| ());
        ticker.abort();
        generated?;

        if !app.download() {
            return Err(ReziError::NoResult);
        }
        let filename = app.download_name().unwrap_or_default();
        let saved_to = saver.target_for(&SaveAnchor {
            href: String::new(),
            filename,
        });
        // Save failures are only logged by the exporter.
        let saved = saved_to.is_file();
        info!(path = %saved_to.display(), saved, credits = app.credits(), "Generation complete");

        let mut output = format_generation_summary(&saved_to, saved, app.credits());
        if share {
            let outcome = app.share().await?;
            if let Some(line) = format_share_outcome(outcome) {
                output.push('\n');
                output.push_str(&line);
            }
        }
        Ok(output)
    }
}

/// Emit each fact once as the index changes. The first change is the reset to
/// fact 0 when a request starts.
async fn relay_facts<F>(facts: Vec<String>, mut updates: watch::Receiver<usize>, mut emit: F)
where
    F: FnMut(&str),
{
    while updates.changed().await.is_ok() {
        let index = *updates.borrow_and_update();
        if let Some(fact) = facts.get(index) {
            emit(fact);
        }
    }
}

#[cfg(feature = "clipboard")]
fn system_clipboard() -> Arc<dyn ImageClipboard> {
    Arc::new(crate::exporter::SystemClipboard)
}

#[cfg(not(feature = "clipboard"))]
fn system_clipboard() -> Arc<dyn ImageClipboard> {
    Arc::new(crate::exporter::NoClipboard)
}
