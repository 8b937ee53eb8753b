//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ReziError;

/// Map domain errors to the message shown to the user.
pub fn map_error(e: &ReziError) -> String {
    e.to_string()
}
