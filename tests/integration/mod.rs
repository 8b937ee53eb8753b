//! Integration tests for the Rezi image compositor


mod cli_route;
mod export_flow;
mod generation_flow;
