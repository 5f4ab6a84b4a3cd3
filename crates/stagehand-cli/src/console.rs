use std::cell::RefCell;
use std::io::{self, BufRead, Write};

use indicatif::{ProgressBar, ProgressStyle};
use stagehand_core::{ArtifactChange, Console, ProgressEvent, ProgressStage};

use crate::render::format_changes_lines;

pub(crate) struct CliConsole {
    assume_yes: bool,
    active: RefCell<Option<ProgressBar>>,
}

impl CliConsole {
    pub(crate) fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            active: RefCell::new(None),
        }
    }
}

fn stage_label(stage: ProgressStage) -> &'static str {
    match stage {
        ProgressStage::LayoutResolution => "Resolving feature-pack layout",
        ProgressStage::PackageInstallation => "Installing packages",
        ProgressStage::ConfigGeneration => "Generating configuration",
        ProgressStage::ModuleInstallation => "Installing server modules",
    }
}

impl Console for CliConsole {
    fn progress_update(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Starting(stage) => {
                let bar = ProgressBar::new(100);
                if let Ok(style) =
                    ProgressStyle::with_template("{msg:<32} [{bar:20}] {pos:>3}%")
                {
                    bar.set_style(style.progress_chars("=>-"));
                }
                bar.set_message(stage_label(stage));
                *self.active.borrow_mut() = Some(bar);
            }
            ProgressEvent::Pulse(_, percent) => {
                if let Some(bar) = self.active.borrow().as_ref() {
                    bar.set_position(percent.clamp(0.0, 100.0) as u64);
                }
            }
            ProgressEvent::Completed(stage) => {
                if let Some(bar) = self.active.borrow_mut().take() {
                    bar.finish_and_clear();
                }
                println!("{} done", stage_label(stage));
            }
        }
    }

    fn changes_found(&self, changes: &[ArtifactChange]) {
        for line in format_changes_lines(changes) {
            println!("{line}");
        }
    }

    fn println(&self, text: &str) {
        println!("{text}");
    }

    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            println!("{prompt} y");
            return true;
        }

        print!("{prompt} [y/N] ");
        let _ = io::stdout().flush();

        let mut response = String::new();
        if io::stdin().lock().read_line(&mut response).is_err() {
            return false;
        }
        matches!(response.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}
