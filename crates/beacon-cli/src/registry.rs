//! Command tree assembled at startup and handed to clap.
//!
//! Commands are registered explicitly, in order, before any of them runs. The
//! finished registry renders itself as a `clap::Command` for parsing and maps
//! the matched subcommand path back to its action.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{ArgMatches, Command};
use thiserror::Error;

use crate::client::CliResult;
use crate::remote::RemoteClientProvider;

/// Top-level commands may own children; their children may not.
const MAX_DEPTH: usize = 2;

/// Failure to register a command. Fatal at startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// A sibling with the same name already exists.
    #[error("command `{name}` is already registered under `{parent}`")]
    Duplicate {
        /// Path of the parent command.
        parent: String,
        /// Name that collided.
        name: &'static str,
    },
    /// The parent is already at the maximum nesting depth.
    #[error("command `{name}` cannot be nested under `{parent}`")]
    TooDeep {
        /// Path of the parent command.
        parent: String,
        /// Name that was rejected.
        name: &'static str,
    },
}

/// Everything an action may touch while it runs.
pub(crate) struct CommandEnv<'a> {
    pub(crate) remote: &'a dyn RemoteClientProvider,
    pub(crate) out: &'a mut (dyn Write + Send),
    pub(crate) diag: &'a mut (dyn Write + Send),
}

/// Executable body of a registered command.
#[async_trait]
pub(crate) trait CommandAction: Send + Sync {
    async fn execute(&self, env: &mut CommandEnv<'_>) -> CliResult<()>;
}

struct CommandNode {
    name: &'static str,
    path: String,
    about: &'static str,
    long_about: Option<&'static str>,
    action: Option<Arc<dyn CommandAction>>,
    children: Vec<Self>,
}

impl CommandNode {
    fn attach(
        &mut self,
        depth: usize,
        name: &'static str,
        about: &'static str,
        long_about: &'static str,
        action: Arc<dyn CommandAction>,
    ) -> Result<&mut Self, RegistrationError> {
        if depth >= MAX_DEPTH {
            return Err(RegistrationError::TooDeep {
                parent: self.path.clone(),
                name,
            });
        }
        if self.children.iter().any(|child| child.name == name) {
            return Err(RegistrationError::Duplicate {
                parent: self.path.clone(),
                name,
            });
        }

        self.children.push(Self {
            name,
            path: format!("{} {name}", self.path),
            about,
            long_about: Some(long_about).filter(|text| !text.trim().is_empty()),
            action: Some(action),
            children: Vec::new(),
        });
        let index = self.children.len() - 1;
        Ok(&mut self.children[index])
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(self.name).about(self.about);
        if let Some(long_about) = self.long_about {
            command = command.long_about(long_about);
        }
        self.children
            .iter()
            .fold(command, |command, child| command.subcommand(child.to_command()))
    }

    fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }
}

/// Ordered tree of named commands below the binary's root.
pub(crate) struct CommandRegistry {
    root: CommandNode,
}

impl CommandRegistry {
    pub(crate) fn new(name: &'static str, about: &'static str) -> Self {
        Self {
            root: CommandNode {
                name,
                path: name.to_string(),
                about,
                long_about: None,
                action: None,
                children: Vec::new(),
            },
        }
    }

    /// Register a top-level command.
    pub(crate) fn add_command(
        &mut self,
        name: &'static str,
        about: &'static str,
        long_about: &'static str,
        action: impl CommandAction + 'static,
    ) -> Result<CommandHandle<'_>, RegistrationError> {
        let node = self.root.attach(0, name, about, long_about, Arc::new(action))?;
        Ok(CommandHandle { node, depth: 1 })
    }

    /// Render the tree as a clap command. The root requires a subcommand;
    /// group commands run their own action when invoked alone.
    pub(crate) fn to_command(&self) -> Command {
        self.root
            .to_command()
            .subcommand_required(true)
            .arg_required_else_help(true)
    }

    /// Find the action selected by `matches`, with its space-separated path
    /// below the root (e.g. `meta status`).
    pub(crate) fn resolve(
        &self,
        matches: &ArgMatches,
    ) -> Option<(String, Arc<dyn CommandAction>)> {
        let mut node = &self.root;
        let mut matches = matches;
        let mut path = Vec::new();
        while let Some((name, sub_matches)) = matches.subcommand() {
            node = node.child(name)?;
            path.push(node.name);
            matches = sub_matches;
        }
        node.action
            .as_ref()
            .map(|action| (path.join(" "), Arc::clone(action)))
    }
}

/// Handle to a registered command, used to attach its children.
pub(crate) struct CommandHandle<'a> {
    node: &'a mut CommandNode,
    depth: usize,
}

impl CommandHandle<'_> {
    /// Register a child of this command.
    pub(crate) fn add_command(
        &mut self,
        name: &'static str,
        about: &'static str,
        long_about: &'static str,
        action: impl CommandAction + 'static,
    ) -> Result<CommandHandle<'_>, RegistrationError> {
        let depth = self.depth;
        let node = self
            .node
            .attach(depth, name, about, long_about, Arc::new(action))?;
        Ok(CommandHandle {
            node,
            depth: depth + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl CommandAction for Counting {
        async fn execute(&self, _env: &mut CommandEnv<'_>) -> CliResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn noop() -> Counting {
        Counting(Arc::new(AtomicUsize::new(0)))
    }

    fn sample_registry() -> Result<CommandRegistry, RegistrationError> {
        let mut registry = CommandRegistry::new("beacon", "test root");
        let mut meta = registry.add_command("meta", "server meta-information", "", noop())?;
        meta.add_command("status", "server status", "Shows status.", noop())?;
        meta.add_command("config", "server config", "Shows config.", noop())?;
        Ok(registry)
    }

    #[test]
    fn duplicate_sibling_is_rejected_and_first_kept() -> Result<(), RegistrationError> {
        let mut registry = sample_registry()?;
        let err = registry
            .add_command("meta", "another meta", "", noop())
            .err();
        assert_eq!(
            err,
            Some(RegistrationError::Duplicate {
                parent: "beacon".into(),
                name: "meta",
            })
        );

        let meta = registry.root.child("meta").map(|node| node.about);
        assert_eq!(meta, Some("server meta-information"));
        assert_eq!(registry.root.children.len(), 1);
        Ok(())
    }

    #[test]
    fn duplicate_child_reports_parent_path() -> Result<(), RegistrationError> {
        let mut registry = CommandRegistry::new("beacon", "test root");
        let mut meta = registry.add_command("meta", "group", "", noop())?;
        meta.add_command("status", "first", "", noop())?;
        let err = meta.add_command("status", "second", "", noop()).err();
        assert_eq!(
            err.map(|err| err.to_string()),
            Some("command `status` is already registered under `beacon meta`".to_string())
        );
        Ok(())
    }

    #[test]
    fn same_name_under_different_parents_is_allowed() -> Result<(), RegistrationError> {
        let mut registry = CommandRegistry::new("beacon", "test root");
        registry
            .add_command("meta", "group", "", noop())?
            .add_command("status", "meta status", "", noop())?;
        registry
            .add_command("repo", "group", "", noop())?
            .add_command("status", "repo status", "", noop())?;
        Ok(())
    }

    #[test]
    fn nesting_stops_at_one_level() -> Result<(), RegistrationError> {
        let mut registry = CommandRegistry::new("beacon", "test root");
        let mut meta = registry.add_command("meta", "group", "", noop())?;
        let mut status = meta.add_command("status", "leaf", "", noop())?;
        let err = status.add_command("verbose", "too deep", "", noop()).err();
        assert!(matches!(err, Some(RegistrationError::TooDeep { name: "verbose", .. })));
        Ok(())
    }

    #[test]
    fn clap_tree_carries_help_text() -> Result<(), RegistrationError> {
        let command = sample_registry()?.to_command();
        let meta = command
            .find_subcommand("meta")
            .map(|meta| (meta.get_about().map(ToString::to_string), meta.get_long_about().is_none()));
        assert_eq!(meta, Some((Some("server meta-information".into()), true)));

        let status_help = command
            .find_subcommand("meta")
            .and_then(|meta| meta.find_subcommand("status"))
            .and_then(|status| status.get_long_about().map(ToString::to_string));
        assert_eq!(status_help.as_deref(), Some("Shows status."));
        Ok(())
    }

    #[test]
    fn resolve_walks_matched_path() -> Result<(), Box<dyn std::error::Error>> {
        let registry = sample_registry()?;
        let matches = registry
            .to_command()
            .try_get_matches_from(["beacon", "meta", "status"])?;
        let label = registry.resolve(&matches).map(|(label, _)| label);
        assert_eq!(label.as_deref(), Some("meta status"));

        let group = registry
            .to_command()
            .try_get_matches_from(["beacon", "meta"])?;
        let label = registry.resolve(&group).map(|(label, _)| label);
        assert_eq!(label.as_deref(), Some("meta"));
        Ok(())
    }

    #[test]
    fn root_without_subcommand_is_a_usage_error() -> Result<(), RegistrationError> {
        let result = sample_registry()?
            .to_command()
            .try_get_matches_from(["beacon"]);
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn unknown_subcommand_is_rejected() -> Result<(), RegistrationError> {
        let result = sample_registry()?
            .to_command()
            .try_get_matches_from(["beacon", "meta", "restart"]);
        assert!(result.is_err());
        Ok(())
    }
}
