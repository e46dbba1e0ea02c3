use std::{fmt::Write as _, path::PathBuf};

use {anyhow::Result, clap::Subcommand};

use folio_config::validate::{self, Severity, ValidationResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration as TOML.
    Show,
    /// Print the path of the config file in use (or the one `init` would create).
    Path,
    /// Write a config file with default values.
    Init {
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => {
            let result = validate::validate(None);
            eprint!("{}", render_check(&result, verbose, true));
            ensure_no_errors(&result)
        },
        ConfigAction::Show => {
            print!("{}", show()?);
            Ok(())
        },
        ConfigAction::Path => {
            println!("{}", folio_config::find_or_default_config_path().display());
            Ok(())
        },
        ConfigAction::Init { force } => {
            let written = init(force)?;
            eprintln!("Wrote {}", written.display());
            Ok(())
        },
    }
}

fn show() -> Result<String> {
    Ok(toml::to_string_pretty(&folio_config::discover_and_load())?)
}

fn init(force: bool) -> Result<PathBuf> {
    let path = folio_config::find_or_default_config_path();
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    folio_config::save_config(&folio_config::FolioConfig::default())
}

fn ensure_no_errors(result: &ValidationResult) -> Result<()> {
    match result.count(Severity::Error) {
        0 => Ok(()),
        n => anyhow::bail!("config has {n} error(s)"),
    }
}

/// One line per diagnostic plus a summary. Info lines only with `verbose`.
fn render_check(result: &ValidationResult, verbose: bool, ansi: bool) -> String {
    let paint = |severity: Severity| -> (&'static str, &'static str) {
        if !ansi {
            return ("", "");
        }
        let color = match severity {
            Severity::Error => "\x1b[1;31m",
            Severity::Warning => "\x1b[1;33m",
            Severity::Info => "\x1b[1;36m",
        };
        (color, "\x1b[0m")
    };

    let mut out = match result.config_path {
        Some(ref path) => format!("{}\n", path.display()),
        None => "(no config file, defaults)\n".to_string(),
    };

    let shown: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| verbose || d.severity != Severity::Info)
        .collect();
    for d in &shown {
        let (on, off) = paint(d.severity);
        let location = if d.path.is_empty() {
            String::new()
        } else {
            format!("{}: ", d.path)
        };
        let _ = writeln!(out, "  {on}{}{off} {location}{}", d.severity, d.message);
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if errors + warnings == 0 {
        out.push_str("ok\n");
    } else {
        let _ = writeln!(out, "{errors} error(s), {warnings} warning(s)");
    }
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard};

    use super::*;

    /// The config dir override is process-wide.
    static CONFIG_DIR: Mutex<()> = Mutex::new(());

    struct IsolatedConfigDir {
        dir: tempfile::TempDir,
        _guard: MutexGuard<'static, ()>,
    }

    impl IsolatedConfigDir {
        fn new() -> Self {
            let guard = CONFIG_DIR.lock().unwrap_or_else(|e| e.into_inner());
            let dir = tempfile::tempdir().unwrap();
            folio_config::set_config_dir(dir.path().to_path_buf());
            Self { dir, _guard: guard }
        }
    }

    impl Drop for IsolatedConfigDir {
        fn drop(&mut self) {
            folio_config::clear_config_dir();
        }
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let cfg = IsolatedConfigDir::new();
        let path = cfg.dir.path().join("folio.toml");

        assert_eq!(init(false).unwrap(), path);
        std::fs::write(&path, "[download]\ndelay_ms = 10\n").unwrap();

        let err = init(false).unwrap_err();
        assert!(err.to_string().contains("--force"), "{err}");
        assert!(std::fs::read_to_string(&path).unwrap().contains("delay_ms = 10"));

        init(true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("delay_ms = 300"));
    }

    #[test]
    fn path_and_show_follow_the_config_dir() {
        let cfg = IsolatedConfigDir::new();
        std::fs::write(cfg.dir.path().join("folio.toml"), "[download]\njpeg_quality = 80\n").unwrap();

        assert_eq!(
            folio_config::find_or_default_config_path(),
            cfg.dir.path().join("folio.toml")
        );
        assert!(show().unwrap().contains("jpeg_quality = 80"));
        handle_config(ConfigAction::Path).unwrap();
    }

    #[test]
    fn check_fails_on_errors_and_passes_on_warnings() {
        let cfg = IsolatedConfigDir::new();
        let path = cfg.dir.path().join("folio.toml");

        std::fs::write(&path, "[download]\njpeg_quality = 0\n").unwrap();
        assert!(handle_config(ConfigAction::Check { verbose: false }).is_err());

        std::fs::write(&path, "[download]\ndelay_ms = 0\n").unwrap();
        handle_config(ConfigAction::Check { verbose: false }).unwrap();
    }

    #[test]
    fn render_lists_diagnostics_and_hides_info_unless_verbose() {
        let result = validate::validate_toml_str("[download]\ndely_ms = 5\n");
        let text = render_check(&result, false, false);
        assert!(text.contains("error download.dely_ms: unknown field"), "{text}");
        assert!(text.ends_with("1 error(s), 0 warning(s)\n"), "{text}");

        let no_file = ValidationResult {
            diagnostics: vec![validate::Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
        assert_eq!(render_check(&no_file, false, false), "(no config file, defaults)\nok\n");
        assert_eq!(
            render_check(&no_file, true, false),
            "(no config file, defaults)\n  info no config file found; using defaults\nok\n"
        );
    }
}
