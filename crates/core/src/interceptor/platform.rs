use serde::Serialize;
use std::fmt;

use crate::impl_case_insensitive_deserialize;

/// One of the host's platform-scoped terminal environment buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalPlatform {
    Linux,
    Osx,
    Windows,
}

impl_case_insensitive_deserialize!(
    TerminalPlatform,
    Linux => "linux",
    Osx => "osx",
    Windows => "windows"
);

impl TerminalPlatform {
    pub const ALL: [TerminalPlatform; 3] = [
        TerminalPlatform::Linux,
        TerminalPlatform::Osx,
        TerminalPlatform::Windows,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalPlatform::Linux => "linux",
            TerminalPlatform::Osx => "osx",
            TerminalPlatform::Windows => "windows",
        }
    }

    /// Editor setting holding this bucket
    pub fn setting_key(&self) -> String {
        format!("terminal.integrated.env.{}", self.as_str())
    }

    pub fn path_separator(&self) -> char {
        match self {
            TerminalPlatform::Windows => ';',
            _ => ':',
        }
    }

    /// Bucket for the platform this process runs on
    pub fn current() -> Self {
        if cfg!(windows) {
            TerminalPlatform::Windows
        } else if cfg!(target_os = "macos") {
            TerminalPlatform::Osx
        } else {
            TerminalPlatform::Linux
        }
    }
}

impl fmt::Display for TerminalPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setting_keys() {
        let keys: Vec<String> = TerminalPlatform::ALL.iter().map(|p| p.setting_key()).collect();
        assert_eq!(
            keys,
            vec![
                "terminal.integrated.env.linux",
                "terminal.integrated.env.osx",
                "terminal.integrated.env.windows"
            ]
        );
    }

    #[test]
    fn test_platform_names_ignore_case() {
        let platforms: Vec<TerminalPlatform> =
            serde_json::from_str(r#"["Linux", "OSX", "windows"]"#).unwrap();
        assert_eq!(platforms, TerminalPlatform::ALL.to_vec());
    }
}
