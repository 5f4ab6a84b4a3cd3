use crate::change::ArtifactChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    LayoutResolution,
    PackageInstallation,
    ConfigGeneration,
    ModuleInstallation,
}

impl ProgressStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LayoutResolution => "layout-resolution",
            Self::PackageInstallation => "package-installation",
            Self::ConfigGeneration => "config-generation",
            Self::ModuleInstallation => "module-installation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    Starting(ProgressStage),
    Pulse(ProgressStage, f64),
    Completed(ProgressStage),
}

impl ProgressEvent {
    pub fn stage(&self) -> ProgressStage {
        match self {
            Self::Starting(stage) | Self::Pulse(stage, _) | Self::Completed(stage) => *stage,
        }
    }
}

pub trait Console {
    fn progress_update(&self, event: ProgressEvent);
    fn changes_found(&self, changes: &[ArtifactChange]);
    fn println(&self, text: &str);
    fn confirm(&self, prompt: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullConsole;

impl Console for NullConsole {
    fn progress_update(&self, _event: ProgressEvent) {}

    fn changes_found(&self, _changes: &[ArtifactChange]) {}

    fn println(&self, _text: &str) {}

    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}
