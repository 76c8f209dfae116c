// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Core traits and data structures for live multi-stream audio capture,
//! sample-aligned persistence, and incremental speaker-labelled transcription.
//!
//! ## Core Modules
//!
//! - [`frame`]: binary framing for the capture protocol.
//! - [`writer`]: durable raw+WAV sinks and the snapshot read barrier.
//! - [`aligner`]: timestamp-to-sample alignment (silence/overlap handling).
//! - [`engines`]: narrow traits for the normaliser/ASR/diariser black boxes.
//! - [`pipeline`]: single-flight orchestration of one transcribe+diarise+merge pass.
//! - [`speaker`]: overlap+nearest-neighbour speaker assignment, UNKNOWN interpolation.
//! - [`turns`]: word→turn grouping and punctuation-aware joining.
//! - [`emitter`]: monotone incremental transcript emission.
//! - [`events`]: NDJSON-serialisable output record types.
//! - [`types`]: shared data model (`Word`, `DiarSegment`, `SpeakerTurn`, ...).
//! - [`error`]: the crate's error type.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use meetcap_core::engines::{AsrEngine, Diariser, FfmpegNormaliser};
//! use meetcap_core::pipeline::PipelineDriver;
//!
//! # struct MyAsr; impl AsrEngine for MyAsr {
//! #   fn transcribe(&self, _: &std::path::Path, _: Option<&str>) -> meetcap_core::error::Result<(String, Vec<meetcap_core::types::Word>)> { unimplemented!() }
//! # }
//! # struct MyDiariser; impl Diariser for MyDiariser {
//! #   fn diarise(&self, _: &std::path::Path) -> meetcap_core::error::Result<Vec<meetcap_core::types::DiarSegment>> { unimplemented!() }
//! # }
//! let driver = PipelineDriver::new(Arc::new(FfmpegNormaliser), Arc::new(MyAsr), Arc::new(MyDiariser));
//! ```

pub mod aligner;
pub mod emitter;
pub mod engines;
pub mod error;
pub mod events;
pub mod frame;
pub mod pipeline;
pub mod speaker;
pub mod turns;
pub mod types;
pub mod writer;

pub use error::CoreError;
pub use types::{DiarSegment, LabelledWord, MergedTranscript, SpeakerTurn, Word};
