//! Completions command - shell completion scripts

use clap::CommandFactory;
use clap_complete::Shell;
use std::io::Write;

use crate::cli::Cli;

/// Write the completion script for `shell` to stdout
pub fn execute(shell: Shell) {
    let stdout = std::io::stdout();
    generate(shell, &mut stdout.lock());
}

/// Write the completion script for `shell` to `out`
pub fn generate<W: Write>(shell: Shell, out: &mut W) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completions_mention_commands() {
        let mut buf = Vec::new();
        generate(Shell::Bash, &mut buf);
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("repotag"));
        assert!(script.contains("retag"));
        assert!(script.contains("--all-tags"));
    }
}
