//! Rezi: Childhood and Present, Together
//!
//! Upload a childhood photo and a current photo, describe a scene, and have an
//! image generation service composite them into one nostalgic picture. Each
//! successful generation costs credits from a locally persisted balance.

pub mod app;
pub mod cli;
pub mod config;
pub mod encoded_image;
pub mod error;
pub mod exporter;
pub mod ingestion;
pub mod ledger;
pub mod logging;
pub mod orchestrator;
pub mod progress;
pub mod provider;

pub use app::{Collaborators, ReziApp};
pub use encoded_image::EncodedImage;
pub use error::ReziError;
pub use orchestrator::RequestLifecycleState;
