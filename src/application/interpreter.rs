//! Batch command interpreter driving the tree store.
//!
//! Input: a node count `N`, `N` declarations `id name`, then commands until
//! end of input. Declarations are validated strictly; commands that cannot
//! run are skipped with a diagnostic and never abort the run.

use std::io::{BufRead, Write};

use generational_arena::Index;
use tracing::{debug, info, instrument, warn};

use crate::application::command::{Command, Keyword};
use crate::application::registry::NodeRegistry;
use crate::application::tokens::Tokens;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{render_children, CycleCheck, NodeId, RemovePolicy, SortKey, TreeArena};

/// Id of the root node in the declared id space.
pub const ROOT_ID: NodeId = 0;

/// Upper bound for the declared node count.
pub const DEFAULT_MAX_NODES: usize = 1_000_000;

/// Interpreter knobs, usually derived from [`crate::config::Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub cycle_check: CycleCheck,
    pub remove_policy: RemovePolicy,
    pub max_nodes: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cycle_check: CycleCheck::default(),
            remove_policy: RemovePolicy::default(),
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

/// Counters for a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub skipped: usize,
}

pub struct Interpreter<W> {
    arena: TreeArena,
    registry: NodeRegistry,
    root: Index,
    remove_policy: RemovePolicy,
    out: W,
    summary: RunSummary,
}

impl<W: Write> Interpreter<W> {
    /// Reads the node count and the declarations, creating every node.
    #[instrument(level = "debug", skip(tokens, out))]
    pub fn load<R: BufRead>(tokens: &mut Tokens<R>, options: Options, out: W) -> ApplicationResult<Self> {
        let count_token = tokens
            .next_token()?
            .ok_or_else(|| ApplicationError::TruncatedInput("missing number of nodes".into()))?;
        let count = count_token
            .parse::<usize>()
            .ok()
            .filter(|&n| n >= 1 && n <= options.max_nodes)
            .ok_or(ApplicationError::InvalidNodeCount(count_token))?;

        let mut registry = NodeRegistry::with_capacity(count)?;
        let mut arena = TreeArena::with_capacity(count).with_cycle_check(options.cycle_check);

        for declared in 0..count {
            let id_token = tokens.next_token()?.ok_or_else(|| {
                ApplicationError::TruncatedInput(format!("{declared} of {count} nodes declared"))
            })?;
            let id = id_token
                .parse::<NodeId>()
                .ok()
                .filter(|&id| registry.contains_id(id))
                .ok_or(ApplicationError::InvalidDeclaration(id_token))?;
            let name = tokens.next_token()?.ok_or_else(|| {
                ApplicationError::TruncatedInput(format!("missing name for node {id}"))
            })?;
            if registry.get(id).is_ok() {
                return Err(ApplicationError::DuplicateId(id));
            }
            let idx = arena.create(id, name);
            registry.declare(id, idx)?;
        }

        let root = registry.get(ROOT_ID)?;
        arena.set_root(root)?;
        info!(nodes = registry.len(), "nodes declared");

        Ok(Self {
            arena,
            registry,
            root,
            remove_policy: options.remove_policy,
            out,
            summary: RunSummary::default(),
        })
    }

    /// Executes commands until end of input.
    ///
    /// Only I/O failures end the run early.
    pub fn run<R: BufRead>(&mut self, tokens: &mut Tokens<R>) -> ApplicationResult<RunSummary> {
        'commands: while let Some(word) = tokens.next_token()? {
            let keyword = match word.parse::<Keyword>() {
                Ok(keyword) => keyword,
                Err(e) => {
                    warn!(line = tokens.line(), "{e}, skipping");
                    self.summary.skipped += 1;
                    continue;
                }
            };

            let mut args = Vec::with_capacity(keyword.arity());
            while args.len() < keyword.arity() {
                let Some(token) = tokens.next_token()? else {
                    warn!(command = %keyword, "missing arguments at end of input");
                    self.summary.skipped += 1;
                    break 'commands;
                };
                match token.parse::<NodeId>() {
                    Ok(arg) => args.push(arg),
                    Err(_) => {
                        warn!(line = tokens.line(), command = %keyword, %token, "malformed argument, skipping command");
                        self.summary.skipped += 1;
                        // The token may start the next command.
                        tokens.push_back(token);
                        continue 'commands;
                    }
                }
            }

            self.apply(keyword, &args)?;
        }
        info!(executed = self.summary.executed, skipped = self.summary.skipped, "end of input");
        Ok(self.summary)
    }

    /// Builds and executes one command, counting it as executed or skipped.
    ///
    /// Returns `Ok(false)` for a skipped command. Only I/O and config
    /// failures are returned as errors.
    pub fn apply(&mut self, keyword: Keyword, args: &[NodeId]) -> ApplicationResult<bool> {
        let outcome = Command::from_args(keyword, args).and_then(|command| self.execute(command));
        match outcome {
            Ok(()) => {
                self.summary.executed += 1;
                Ok(true)
            }
            Err(ApplicationError::Domain(e)) => {
                debug!(command = %keyword, ?args, error = %e, "command skipped");
                self.summary.skipped += 1;
                Ok(false)
            }
            Err(e) if e.is_skippable() => {
                warn!(command = %keyword, ?args, "{e}, skipping");
                self.summary.skipped += 1;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Executes a single command against the store.
    #[instrument(level = "debug", skip(self))]
    pub fn execute(&mut self, command: Command) -> ApplicationResult<()> {
        match command {
            Command::Add { parent, child } => {
                let parent = self.resolve(parent)?;
                let child = self.resolve(child)?;
                self.arena.add_child(parent, child)?;
            }
            Command::Remove { id } => {
                self.resolve(id)?;
                if id == ROOT_ID {
                    return Err(ApplicationError::RootRemoval);
                }
                if self
                    .arena
                    .remove(self.root, id, self.remove_policy)?
                    .is_none()
                {
                    debug!(id, "REMOVE: node is not part of the tree");
                }
            }
            Command::Move { parent, child } => {
                self.resolve(parent)?;
                self.resolve(child)?;
                self.arena.move_node(Some(self.root), parent, child)?;
            }
            Command::SortId { id } => self.sort(id, SortKey::Id)?,
            Command::SortName { id } => self.sort(id, SortKey::Name)?,
            Command::Print { id } => {
                let node = self.resolve(id)?;
                if let Some(line) = render_children(&self.arena, node) {
                    writeln!(self.out, "{line}")
                        .map_err(|e| ApplicationError::io("write PRINT output", e))?;
                }
            }
        }
        Ok(())
    }

    /// Live handle for a declared id.
    pub fn resolve(&self, id: NodeId) -> ApplicationResult<Index> {
        let idx = self.registry.get(id)?;
        if !self.arena.contains(idx) {
            return Err(ApplicationError::NodeRemoved(id));
        }
        Ok(idx)
    }

    pub fn arena(&self) -> &TreeArena {
        &self.arena
    }

    pub fn root(&self) -> Index {
        self.root
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn flush(&mut self) -> ApplicationResult<()> {
        self.out
            .flush()
            .map_err(|e| ApplicationError::io("flush output", e))
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Sorts the children of `id`, then re-binds the sorted ids to the slots
    /// now carrying them.
    fn sort(&mut self, id: NodeId, key: SortKey) -> ApplicationResult<()> {
        let node = self.resolve(id)?;
        for slot in self.arena.sort_children(node, key)? {
            let moved = self.arena.data(slot)?.id;
            self.registry.rebind(moved, slot)?;
        }
        Ok(())
    }
}
