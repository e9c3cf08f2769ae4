//! Test command line construction

use crate::config::RunnerSettings;

/// Script every Django project keeps at its root.
pub const MANAGE_SCRIPT: &str = "./manage.py";
pub const TEST_SUBCOMMAND: &str = "test";

/// Build the shell line that runs `test_path`.
///
/// Parts are joined with single spaces; empty parts (an unset prefix, no
/// flags, the app-level identifier) are left out.
pub fn command_line(settings: &RunnerSettings, test_path: &str) -> String {
    [
        settings.prefix_command.trim(),
        settings.python_path.trim(),
        MANAGE_SCRIPT,
        TEST_SUBCOMMAND,
        settings.flags.trim(),
        test_path,
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}
