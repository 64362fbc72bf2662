//! Generic command built from ordered, deduplicated arguments.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::argument::{Argument, ArgumentKey};

/// A target executable and its arguments.
///
/// At most one argument exists per key. Setting an argument whose key is already
/// present replaces its values in place, so the original position is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub target: String,
    args: Vec<Argument>,
}

impl Command {
    /// Creates a command without arguments.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            args: Vec::new(),
        }
    }

    /// Creates a command from a list of arguments, applying the same
    /// replace-in-place rule as [`Command::set_argument`].
    pub fn with_args(target: impl Into<String>, args: impl IntoIterator<Item = Argument>) -> Self {
        let mut command = Self::new(target);
        for arg in args {
            command.set_argument(arg);
        }
        command
    }

    /// Inserts or replaces an argument.
    pub fn set_argument(&mut self, argument: Argument) -> &mut Self {
        match self.args.iter_mut().find(|a| a.key == argument.key) {
            Some(existing) => existing.values = argument.values,
            None => self.args.push(argument),
        }
        self
    }

    /// Shorthand for [`Command::set_argument`] from a key and values.
    pub fn arg<I, S>(&mut self, key: impl Into<ArgumentKey>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_argument(Argument::new(key, values))
    }

    /// Owned variant of [`Command::set_argument`].
    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.set_argument(argument);
        self
    }

    /// Removes an argument by key. Returns the removed argument if present.
    pub fn remove_argument(&mut self, key: &ArgumentKey) -> Option<Argument> {
        let index = self.args.iter().position(|a| &a.key == key)?;
        Some(self.args.remove(index))
    }

    /// Looks up an argument by key.
    pub fn get(&self, key: &ArgumentKey) -> Option<&Argument> {
        self.args.iter().find(|a| &a.key == key)
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// Arguments rendered without the target.
    pub fn args_only(&self) -> String {
        self.args
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Full command line: target followed by the arguments.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Argument tokens for process spawning (target excluded).
    pub fn to_argv(&self) -> Vec<String> {
        self.args.iter().flat_map(|a| a.tokens()).collect()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)?;
        let args = self.args_only();
        if !args.is_empty() {
            write!(f, " {}", args)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_mixed_prefixes() {
        let cmd = Command::with_args(
            "bin",
            [
                Argument::new(ArgumentKey::long("help"), ["more"]),
                Argument::new(ArgumentKey::short("a"), ["500", "big"]),
            ],
        );
        assert_eq!(cmd.render(), "bin --help more -a 500 big");
    }

    #[test]
    fn test_empty_command_renders_target_only() {
        assert_eq!(Command::new("bin").render(), "bin");
        assert_eq!(Command::new("bin").args_only(), "");
    }

    #[test]
    fn test_replace_keeps_original_position() {
        let mut cmd = Command::new("bin");
        cmd.arg(ArgumentKey::short("a"), ["1"])
            .arg(ArgumentKey::short("b"), ["2"])
            .arg(ArgumentKey::short("a"), ["3", "4"]);

        assert_eq!(cmd.args().len(), 2);
        assert_eq!(cmd.render(), "bin -a 3 4 -b 2");
    }

    #[test]
    fn test_same_name_different_prefix_are_distinct() {
        let mut cmd = Command::new("bin");
        cmd.arg(ArgumentKey::short("v"), ["x"])
            .arg(ArgumentKey::long("v"), ["y"]);
        assert_eq!(cmd.render(), "bin -v x --v y");
    }

    #[test]
    fn test_remove_argument() {
        let mut cmd = Command::new("bin");
        cmd.arg(ArgumentKey::short("a"), ["1"])
            .arg(ArgumentKey::short("b"), ["2"]);
        let removed = cmd.remove_argument(&ArgumentKey::short("a")).unwrap();
        assert_eq!(removed.values, vec!["1"]);
        assert_eq!(cmd.render(), "bin -b 2");
        assert!(cmd.remove_argument(&ArgumentKey::short("zz")).is_none());
    }

    #[test]
    fn test_to_argv_flattens_tokens() {
        let cmd = Command::new("bin")
            .with_argument(Argument::flag(ArgumentKey::short("y")))
            .with_argument(Argument::new(ArgumentKey::short("i"), ["in.mp4"]));
        assert_eq!(cmd.to_argv(), vec!["-y", "-i", "in.mp4"]);
    }
}
