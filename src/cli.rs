//! CLI domain: parse, route, output, and presentation only.
//! The workflow itself lives in [`crate::app`].

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_credits, format_facts, format_generation_summary, format_share_outcome,
};
pub use route::RunContext;
