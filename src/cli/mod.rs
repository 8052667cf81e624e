//! CLI operation mode handlers.
//!
//! This module contains the implementations for the two operation modes:
//! - [`pipeline_run`]: Fetch, normalize and load every configured repository
//! - [`warehouse_check`]: Count the rows of the destination table
//!
//! Output formatting utilities are in [`output`].

pub mod output;
pub mod pipeline_run;
pub mod warehouse_check;
