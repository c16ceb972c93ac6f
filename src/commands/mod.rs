//! CLI command implementations for fgkmer.
//!
//! This module contains all the command implementations for the fgkmer CLI
//! tool.
//!
//! # Commands
//!
//! - [`pairs`] - Count (leader, follower) k-mer pairs per cell barcode
//! - [`dump`] - Decode shard files to tab-separated text

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::too_many_lines)]

pub mod command;
pub mod common;
pub mod dump;
pub mod pairs;
