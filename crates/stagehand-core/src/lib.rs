mod change;
mod channel;
mod error;
mod progress;
mod stream;
mod version;

pub use change::{artifact_diff, ArtifactChange};
pub use channel::{
    enforce_channel_names, Channel, ChannelSelection, NoStreamStrategy, Repository,
};
pub use error::OperationError;
pub use progress::{Console, NullConsole, ProgressEvent, ProgressStage};
pub use stream::{ComponentStream, ResolvedManifest};
pub use version::compare_versions;

#[cfg(test)]
mod tests;
