//! Sluice Driver
//!
//! Drives the fetch → summarize → aggregate container pipeline through one run:
//! provisioning, input injection, completion polling, result extraction and
//! teardown.
//!
//! Architecture:
//! - Runtime: the container engine primitives (`build`, `up`, `down`, `exec`,
//!   `cp`, `inspect`, `run`, `logs`) behind the [`ContainerRuntime`] trait
//! - Worker: [`WorkerHandle`] over one named stage container
//! - Volume: [`SharedVolumeProbe`] reaching the shared volume through
//!   disposable helper containers
//! - Channel: [`ArtifactChannel`], the two interchangeable ways of seeing the
//!   terminal artifact
//! - Driver: [`PipelineDriver`], which sequences a whole run

pub mod channel;
pub mod driver;
pub mod error;
pub mod runtime;
pub mod scratch;
pub mod volume;
pub mod worker;

#[cfg(test)]
mod testing;

pub use channel::{ArtifactChannel, ChannelKind, CompletionProbe};
pub use driver::{Completion, ExtractedArtifact, PipelineDriver, RunReport};
pub use error::{PipelineError, Result, RuntimeError};
pub use runtime::{CommandOutput, ComposeRuntime, ContainerRuntime, HelperRun, Mount};
pub use scratch::ScratchDir;
pub use volume::SharedVolumeProbe;
pub use worker::WorkerHandle;
