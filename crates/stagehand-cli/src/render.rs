use anstyle::{AnsiColor, Style};
use stagehand_core::ArtifactChange;

pub(crate) fn format_changes_lines(changes: &[ArtifactChange]) -> Vec<String> {
    if changes.is_empty() {
        return vec!["No updates found".to_string()];
    }

    let mut lines = vec!["Updates found:".to_string()];
    for change in changes {
        let marker = if change.is_downgrade() { "[*]" } else { "   " };
        lines.push(format!(
            "  {marker}{:<50}    {:<20} ==>  {:<20}",
            change.name,
            change.old_version.as_deref().unwrap_or("[]"),
            change.new_version.as_deref().unwrap_or("[]")
        ));
    }

    if changes.iter().any(ArtifactChange::is_downgrade) {
        lines.push(colorize(
            warning_style(),
            "[*] The update list contains downgrades",
        ));
    }
    lines
}

fn warning_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Yellow.into()))
}

fn colorize(style: Style, text: &str) -> String {
    format!("{style}{text}{}", style.render_reset())
}
