use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use colored::Colorize;
use tracing::{debug, instrument};

use crate::application::{Interpreter, RunSummary, Tokens};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{render_tree, DomainResult, RemovePolicy, TreeArena};
use crate::tree_traits::TreeNodeConvert;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        None => _run(cli, None, false),
        Some(Commands::Run { input, dump }) => _run(cli, input.as_deref(), *dump),
        Some(Commands::Demo { termtree }) => _demo(cli, *termtree),
        Some(Commands::Settings { command }) => _settings(cli, command),
        Some(Commands::Completion { shell }) => {
            _completion(*shell);
            Ok(())
        }
    }
}

/// Settings from config files and environment, then command line flags.
fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if cli.strict_cycles {
        settings.strict_cycles = true;
    }
    if let Some(policy) = cli.policy {
        settings.remove_policy = policy;
    }
    debug!(?settings, "effective settings");
    Ok(settings)
}

#[instrument(skip(cli))]
fn _run(cli: &Cli, input: Option<&Path>, dump: bool) -> CliResult<()> {
    let settings = load_settings(cli)?;
    let out = BufWriter::new(io::stdout().lock());
    let summary = match input {
        Some(path) => {
            let file = File::open(path).map_err(|source| CliError::Input {
                path: path.to_path_buf(),
                source,
            })?;
            run_protocol(BufReader::new(file), out, &settings, dump)?
        }
        None => run_protocol(io::stdin().lock(), out, &settings, dump)?,
    };
    debug!(?summary, "run finished");
    Ok(())
}

/// Runs declarations and commands from `input`, writing PRINT output (and
/// the final tree if `dump` is set) to `out`.
pub fn run_protocol<R: BufRead, W: Write>(
    input: R,
    out: W,
    settings: &Settings,
    dump: bool,
) -> CliResult<RunSummary> {
    let mut tokens = Tokens::new(input);
    let mut interpreter = Interpreter::load(&mut tokens, settings.interpreter_options(), out)?;
    let summary = interpreter.run(&mut tokens)?;
    interpreter.flush()?;

    if dump {
        // Iterative rendering: a declared chain can be as deep as `max_nodes`.
        let tree = render_tree(interpreter.arena(), interpreter.root(), 0, &settings.indent);
        let mut out = interpreter.into_output();
        out.write_all(tree.as_bytes())
            .map_err(|e| CliError::io("write tree dump", e))?;
        out.flush().map_err(|e| CliError::io("flush output", e))?;
    }
    Ok(summary)
}

#[instrument(skip(cli))]
fn _demo(cli: &Cli, termtree: bool) -> CliResult<()> {
    let settings = load_settings(cli)?;
    let mut stdout = io::stdout().lock();
    demo_walkthrough(&mut stdout, &settings, termtree)
}

/// Builds a small tree, moves a grandchild between parents with the
/// structural move and removes a subtree with the drop policy, printing the
/// tree after every step.
pub fn demo_walkthrough<W: Write>(out: &mut W, settings: &Settings, termtree: bool) -> CliResult<()> {
    let mut arena = TreeArena::new().with_cycle_check(settings.cycle_check());
    let root = arena.create(1, "Root");
    arena.set_root(root)?;

    let [child1, child2, child3] = [(2, "Child1"), (3, "Child2"), (4, "Child3")]
        .map(|(id, name)| arena.create(id, name));
    let [sub1, sub2] = [(5, "SubChild1"), (6, "SubChild2")].map(|(id, name)| arena.create(id, name));
    let build = |arena: &mut TreeArena| -> DomainResult<()> {
        for child in [child1, child2, child3] {
            arena.add_child(root, child)?;
        }
        arena.add_child(child1, sub1)?;
        arena.add_child(child1, sub2)
    };
    build(&mut arena)?;

    let show = |out: &mut W, arena: &TreeArena, title: &str| -> CliResult<()> {
        let body = if termtree {
            arena.to_tree_string(root).to_string()
        } else {
            render_tree(arena, root, 0, &settings.indent)
        };
        writeln!(out, "{}", title.cyan().bold())
            .and_then(|_| write!(out, "{body}"))
            .map_err(|e| CliError::io("write demo output", e))
    };

    show(&mut *out, &arena, "Original Tree:")?;

    writeln!(out, "\nMoving SubChild1 to Child2...").map_err(|e| CliError::io("write demo output", e))?;
    arena.move_child(child1, child2, sub1)?;
    show(&mut *out, &arena, "\nTree After Moving:")?;

    writeln!(out, "\nRemoving Child3...").map_err(|e| CliError::io("write demo output", e))?;
    arena.remove(root, 4, RemovePolicy::Drop)?;
    show(&mut *out, &arena, "\nTree After Removing Child3:")?;

    Ok(())
}

fn _settings(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => match global_config_path() {
            Some(path) => output::action("global", &path.display()),
            None => output::warning("no home directory, global config disabled"),
        },
    }
    Ok(())
}

fn _completion(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    eprintln!("Generating completion file for {shell:?}...");
    generate(shell, &mut cmd, name, &mut io::stdout());
}
