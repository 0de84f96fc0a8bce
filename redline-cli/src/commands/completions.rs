//! `redline completions` - shell completion scripts
//!
//! Writes the clap_complete script for a shell to stdout. With
//! `--instructions` it reports where that shell picks the script up instead.

use std::io;

use clap::Command;
use clap_complete::{generate, Shell};
use colored::Colorize;
use serde::Serialize;

use crate::output::{Output, OutputConfig, Outputter, TableOutput};

/// How to hook completions for one shell into its startup.
#[derive(Debug, Serialize)]
pub struct InstallGuide {
    pub shell: String,
    /// Startup file that should load the script.
    pub startup_file: String,
    /// Line to add to the startup file.
    pub startup_line: String,
    /// Command saving the script where the shell finds it without a startup line.
    pub save_command: Option<String>,
    /// Subcommands the script completes.
    pub commands: Vec<String>,
}

impl InstallGuide {
    pub fn new(shell: Shell, cmd: &Command) -> Self {
        let bin = cmd.get_name();
        let script = format!("{} completions {}", bin, shell);
        let save = |target: String| Some(format!("{} > {}", script, target));

        let (startup_file, startup_line, save_command) = match shell {
            Shell::Bash => (
                "~/.bashrc",
                format!("eval \"$({})\"", script),
                save(format!("~/.local/share/bash-completion/completions/{}", bin)),
            ),
            Shell::Zsh => (
                "~/.zshrc",
                format!("eval \"$({})\"", script),
                save(format!("~/.zfunc/_{}", bin)),
            ),
            Shell::Fish => (
                "~/.config/fish/config.fish",
                format!("{} | source", script),
                save(format!("~/.config/fish/completions/{}.fish", bin)),
            ),
            Shell::PowerShell => (
                "$PROFILE",
                format!("Invoke-Expression (& {} | Out-String)", script),
                None,
            ),
            Shell::Elvish => (
                "~/.config/elvish/rc.elv",
                format!("eval ({} | slurp)", script),
                None,
            ),
            _ => ("your shell's startup file", script.clone(), None),
        };

        Self {
            shell: shell.to_string(),
            startup_file: startup_file.to_string(),
            startup_line,
            save_command,
            commands: cmd
                .get_subcommands()
                .filter(|sub| !sub.is_hide_set())
                .map(|sub| sub.get_name().to_string())
                .collect(),
        }
    }
}

impl Outputter for InstallGuide {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut output = format!(
            "{} {}\n\n",
            "Completions for".cyan().bold(),
            self.shell.yellow()
        );
        let mut pairs = vec![
            ("Startup file", self.startup_file.clone()),
            ("Add line", self.startup_line.clone()),
        ];
        if let Some(save) = &self.save_command {
            pairs.push(("Or save", save.clone()));
        }
        pairs.push(("Completes", self.commands.join(", ")));
        output.push_str(&TableOutput::format_key_value(&pairs, config));
        output
    }
}

/// Run the completions command
pub fn run(
    shell: Shell,
    cmd: &mut Command,
    show_instructions: bool,
    config: OutputConfig,
) -> anyhow::Result<()> {
    if show_instructions {
        return Output::new(InstallGuide::new(shell, cmd), config).render();
    }
    let bin = cmd.get_name().to_string();
    generate(shell, cmd, bin, &mut io::stdout());
    Ok(())
}
