//! Maintenance command building
//!
//! The local maintenance command is always an explicit program plus an
//! argument list. Configuration values become separate arguments and are
//! never interpolated into a shell line.

use std::fmt;

use crate::config::TsmSettings;

/// Program that drives TSM maintenance on the local node
pub const TSM_PROGRAM: &str = "tsm";

/// Which maintenance command to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// `tsm maintenance backup`
    Backup,
    /// `tsm status -v`, a harmless command for checking the setup
    Status,
}

/// An immutable, fully resolved command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Builds the command for `mode` from the TSM settings
pub fn build_command(mode: RunMode, settings: &TsmSettings) -> CommandSpec {
    match mode {
        RunMode::Status => CommandSpec::new(TSM_PROGRAM, ["status", "-v"]),
        RunMode::Backup => {
            let mut args = vec!["maintenance".to_string(), "backup".to_string()];
            args.extend(settings.backup_args.iter().cloned());
            if let Some(file) = &settings.backup_file {
                args.push("-f".to_string());
                args.push(file.clone());
            }
            CommandSpec {
                program: TSM_PROGRAM.to_string(),
                args,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TsmSettings {
        TsmSettings {
            url: "https://tableau.local".to_string(),
            port: 8850,
            api_version: "0.5".to_string(),
            username: "admin".to_string(),
            password: "pw".to_string(),
            verify_certificates: false,
            backup_args: Vec::new(),
            backup_file: None,
        }
    }

    #[test]
    fn test_status_command() {
        let cmd = build_command(RunMode::Status, &settings());
        assert_eq!(cmd, CommandSpec::new("tsm", ["status", "-v"]));
    }

    #[test]
    fn test_plain_backup_command() {
        let cmd = build_command(RunMode::Backup, &settings());
        assert_eq!(cmd, CommandSpec::new("tsm", ["maintenance", "backup"]));
    }

    #[test]
    fn test_backup_command_with_args_and_file() {
        let mut settings = settings();
        settings.backup_args = vec!["-d".to_string(), "--skip-verification".to_string()];
        settings.backup_file = Some("nightly; rm -rf /".to_string());

        let cmd = build_command(RunMode::Backup, &settings);
        assert_eq!(
            cmd.args,
            vec!["maintenance", "backup", "-d", "--skip-verification", "-f", "nightly; rm -rf /"]
        );
        // the file name stays one argument
        assert_eq!(cmd.args.last().unwrap(), "nightly; rm -rf /");
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let cmd = CommandSpec::new("tsm", ["maintenance", "backup", "-f", "my file"]);
        assert_eq!(cmd.to_string(), r#"tsm maintenance backup -f "my file""#);
    }
}
