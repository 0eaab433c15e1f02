use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::assemble::AssembleError;

/// Process exit codes shared by the CLI and library callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    Findings = 1,
    Config = 2,
    SourceUnavailable = 3,
    UnknownTarget = 4,
    Io = 5,
    InvalidText = 6,
}

impl ExitCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::Findings),
            2 => Some(Self::Config),
            3 => Some(Self::SourceUnavailable),
            4 => Some(Self::UnknownTarget),
            5 => Some(Self::Io),
            6 => Some(Self::InvalidText),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("cannot read source for script '{script}' at {path}: {source}")]
    SourceUnavailable {
        script: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A script's text holds a character outside the XML `Char` production.
    #[error("script '{script}' {field} has character {character:?} at byte {offset}, which XML cannot carry")]
    InvalidText {
        script: String,
        field: &'static str,
        offset: usize,
        character: char,
    },

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}

impl OperationError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::SourceUnavailable { .. } => ExitCode::SourceUnavailable,
            Self::InvalidText { .. } => ExitCode::InvalidText,
            Self::Assemble(AssembleError::UnknownTargetContainer { .. }) => ExitCode::UnknownTarget,
            Self::Io { .. } | Self::Render(_) => ExitCode::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_round_trip_through_u8() {
        for code in [
            ExitCode::Success,
            ExitCode::Findings,
            ExitCode::Config,
            ExitCode::SourceUnavailable,
            ExitCode::UnknownTarget,
            ExitCode::Io,
            ExitCode::InvalidText,
        ] {
            assert_eq!(ExitCode::from_u8(code as u8), Some(code));
        }
        assert_eq!(ExitCode::from_u8(9), None);
    }

    #[test]
    fn invalid_text_names_script_and_character() {
        let err = OperationError::InvalidText {
            script: "FightHUD".into(),
            field: "source",
            offset: 7,
            character: '\u{1b}',
        };
        assert_eq!(err.exit_code(), ExitCode::InvalidText);
        assert_eq!(err.exit_code().code(), 6);
        assert_eq!(
            err.to_string(),
            "script 'FightHUD' source has character '\\u{1b}' at byte 7, which XML cannot carry"
        );
    }

    #[test]
    fn unknown_target_maps_to_its_own_code() {
        let err = OperationError::from(AssembleError::UnknownTargetContainer {
            script: "FightClient".into(),
            parent: "ServerScripts".into(),
        });
        assert_eq!(err.exit_code(), ExitCode::UnknownTarget);
        assert_eq!(
            err.to_string(),
            "script 'FightClient' targets unknown container 'ServerScripts'"
        );
    }
}
