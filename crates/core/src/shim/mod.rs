//! The `php` shim scripts put first on the terminal PATH
//!
//! With the container variable set, a shim changes into the target app's
//! root, so lando resolves that app wherever the terminal happens to be, then
//! forwards its arguments to `lando exec` in the app's service and exits with
//! the command's exit code.
//! Without it, the shim drops its own directory from PATH and runs the next
//! `php` found there.

use crate::{
    error::{Error, Result},
    interceptor::{APP_ROOT_VAR, CONTAINER_VAR, EXEC_CWD_VAR},
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Present in every script this crate writes
pub const SHIM_MARKER: &str = "lando-dock managed shim";
/// Service receiving intercepted commands, overridable per terminal
pub const SERVICE_VAR: &str = "LANDO_DOCK_SERVICE";
pub const DEFAULT_SERVICE: &str = "appserver";
pub const INTERPRETER: &str = "php";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimScript {
    pub file_name: String,
    pub contents: String,
    pub executable: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

/// Default shim location for a workspace
pub fn default_shim_dir(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".vscode").join("lando-dock").join("bin")
}

pub fn render_posix(binary: &str) -> String {
    format!(
        r#"#!/bin/sh
# {marker}
if [ -z "${{{container}:-}}" ]; then
  self_dir=$(CDPATH= cd -- "$(dirname -- "$0")" && pwd)
  PATH=$(printf '%s\n' "$PATH" | tr ':' '\n' | grep -vxF "$self_dir" | paste -sd: -)
  export PATH
  exec {interpreter} "$@"
fi
if [ -n "${{{app_root}:-}}" ]; then
  cd "${app_root}" || exit 1
fi
exec {binary} exec "${{{service}:-{default_service}}}" -- sh -c 'cd "$1" && shift && exec {interpreter} "$@"' sh "${{{cwd}:-/app}}" "$@"
"#,
        marker = SHIM_MARKER,
        container = CONTAINER_VAR,
        app_root = APP_ROOT_VAR,
        service = SERVICE_VAR,
        default_service = DEFAULT_SERVICE,
        cwd = EXEC_CWD_VAR,
        interpreter = INTERPRETER,
        binary = shell_quote(binary),
    )
}

pub fn render_windows(binary: &str) -> String {
    let lines = [
        "@echo off".to_string(),
        format!("rem {SHIM_MARKER}"),
        "setlocal".to_string(),
        format!("if \"%{CONTAINER_VAR}%\"==\"\" goto passthrough"),
        format!("if \"%{SERVICE_VAR}%\"==\"\" set \"{SERVICE_VAR}={DEFAULT_SERVICE}\""),
        format!("if \"%{EXEC_CWD_VAR}%\"==\"\" set \"{EXEC_CWD_VAR}=/app\""),
        format!("if not \"%{APP_ROOT_VAR}%\"==\"\" cd /d \"%{APP_ROOT_VAR}%\" || exit /b 1"),
        format!(
            "\"{binary}\" exec %{SERVICE_VAR}% -- sh -c \"cd \\\"$1\\\" && shift && exec {INTERPRETER} \\\"$@\\\"\" sh \"%{EXEC_CWD_VAR}%\" %*"
        ),
        "exit /b %ERRORLEVEL%".to_string(),
        ":passthrough".to_string(),
        "set \"SELF_DIR=%~dp0\"".to_string(),
        "set \"SELF_DIR=%SELF_DIR:~0,-1%\"".to_string(),
        "call set \"PATH=%%PATH:%SELF_DIR%;=%%\"".to_string(),
        format!("{INTERPRETER} %*"),
        "exit /b %ERRORLEVEL%".to_string(),
    ];
    let mut script = lines.join("\r\n");
    script.push_str("\r\n");
    script
}

/// Both variants, named as the terminal will look them up
pub fn scripts(binary: &str) -> Vec<ShimScript> {
    vec![
        ShimScript {
            file_name: INTERPRETER.to_string(),
            contents: render_posix(binary),
            executable: true,
        },
        ShimScript {
            file_name: format!("{INTERPRETER}.cmd"),
            contents: render_windows(binary),
            executable: false,
        },
    ]
}

pub fn is_managed(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|body| body.contains(SHIM_MARKER))
        .unwrap_or(false)
}

/// Write the shims into `dir`. Nothing is written if either target exists
/// and was not written by us.
pub fn install(dir: &Path, binary: &str) -> Result<InstallReport> {
    let scripts = scripts(binary);

    for script in &scripts {
        let path = dir.join(&script.file_name);
        if path.exists() && !is_managed(&path) {
            return Err(Error::ConfigError(format!(
                "refusing to overwrite {}, it was not installed by lando-dock",
                path.display()
            )));
        }
    }

    fs::create_dir_all(dir)?;
    let mut report = InstallReport::default();
    for script in scripts {
        let path = dir.join(&script.file_name);
        if fs::read_to_string(&path).ok().as_deref() == Some(script.contents.as_str()) {
            debug!("{:?} is up to date", path);
            report.unchanged.push(path);
            continue;
        }
        fs::write(&path, &script.contents)?;
        if script.executable {
            make_executable(&path)?;
        }
        info!("Installed shim {:?}", path);
        report.written.push(path);
    }
    Ok(report)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_posix_shim() {
        insta::assert_snapshot!(render_posix("lando"), @r#"
        #!/bin/sh
        # lando-dock managed shim
        if [ -z "${LANDO_DOCK_CONTAINER:-}" ]; then
          self_dir=$(CDPATH= cd -- "$(dirname -- "$0")" && pwd)
          PATH=$(printf '%s\n' "$PATH" | tr ':' '\n' | grep -vxF "$self_dir" | paste -sd: -)
          export PATH
          exec php "$@"
        fi
        if [ -n "${LANDO_DOCK_APP_ROOT:-}" ]; then
          cd "$LANDO_DOCK_APP_ROOT" || exit 1
        fi
        exec lando exec "${LANDO_DOCK_SERVICE:-appserver}" -- sh -c 'cd "$1" && shift && exec php "$@"' sh "${LANDO_DOCK_EXEC_CWD:-/app}" "$@"
        "#);
    }

    #[test]
    fn test_binary_with_spaces_is_quoted() {
        let script = render_posix("/opt/My Tools/lando");
        assert!(script.contains("exec '/opt/My Tools/lando' exec"));
    }

    #[test]
    fn test_windows_shim_uses_crlf() {
        let script = render_windows("lando");
        assert!(script.starts_with("@echo off\r\nrem lando-dock managed shim\r\n"));
        assert!(script.contains("\"lando\" exec %LANDO_DOCK_SERVICE% --"));
        assert!(script.contains("cd /d \"%LANDO_DOCK_APP_ROOT%\""));
        assert!(!script.replace("\r\n", "").contains('\n'));
    }

    #[cfg(unix)]
    #[test]
    fn test_shim_runs_lando_from_the_target_app_root() -> Result<()> {
        use std::process::Command;

        let temp = TempDir::new()?;
        let app_root = temp.path().join("sites/two");
        let elsewhere = temp.path().join("elsewhere");
        fs::create_dir_all(&app_root)?;
        fs::create_dir_all(&elsewhere)?;

        let fake = temp.path().join("fake-lando");
        fs::write(&fake, "#!/bin/sh\necho \"cwd=$(pwd -P) args=$1 $2\"\nexit 7\n")?;
        make_executable(&fake)?;

        let bin = temp.path().join("bin");
        install(&bin, &fake.display().to_string())?;

        let output = Command::new(bin.join("php"))
            .arg("-v")
            .current_dir(&elsewhere)
            .env(CONTAINER_VAR, "site-two")
            .env(APP_ROOT_VAR, &app_root)
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let app_root = app_root.canonicalize()?;
        assert_eq!(
            stdout.trim(),
            format!("cwd={} args=exec appserver", app_root.display())
        );
        assert_eq!(output.status.code(), Some(7));
        Ok(())
    }

    #[test]
    fn test_install_is_repeatable() -> Result<()> {
        let temp = TempDir::new()?;
        let dir = temp.path().join("bin");

        let first = install(&dir, "lando")?;
        assert_eq!(first.written.len(), 2);
        assert!(is_managed(&dir.join("php")));

        let second = install(&dir, "lando")?;
        assert!(second.written.is_empty());
        assert_eq!(second.unchanged.len(), 2);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dir.join("php"))?.permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
        Ok(())
    }

    #[test]
    fn test_install_refuses_unmanaged_file() -> Result<()> {
        let temp = TempDir::new()?;
        fs::write(temp.path().join("php.cmd"), "@echo off\r\nphp.exe %*\r\n")?;

        let err = install(temp.path(), "lando").unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"));
        assert!(!temp.path().join("php").exists());
        Ok(())
    }
}
