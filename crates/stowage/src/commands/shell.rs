//! Interactive shell with both stores open.
//!
//! The session store only lives as long as the shell, so this is the one
//! place where it is useful from the command line.

use anyhow::Result;
use console::{Style, style};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use stowage_store::{StoreKind, StoreRegistry};

use super::ops::{self, StoreOp};
use super::{Context, print_error, print_note};

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq)]
enum ShellCommand {
    Op(StoreOp),
    Use(StoreKind),
    Help,
    Quit,
}

/// Shell state.
struct Shell {
    registry: StoreRegistry,
    target: StoreKind,
    editor: Editor<(), DefaultHistory>,
    json_output: bool,
}

/// Run the shell until `quit` or Ctrl+D.
pub fn run(ctx: &Context) -> Result<()> {
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();

    let mut shell = Shell {
        registry: ctx.open_registry()?,
        target: ctx.target,
        editor: Editor::with_config(config)?,
        json_output: ctx.json_output,
    };
    shell.run()
}

impl Shell {
    fn run(&mut self) -> Result<()> {
        self.print_welcome();

        loop {
            let prompt = format!(
                "{}:{}> ",
                self.target,
                self.registry.get(self.target).namespace()
            );

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    match parse_line(line) {
                        Ok(ShellCommand::Quit) => break,
                        Ok(ShellCommand::Help) => print_help(),
                        Ok(ShellCommand::Use(kind)) => {
                            self.target = kind;
                            print_note(&format!("Using {} store", kind));
                        }
                        Ok(ShellCommand::Op(op)) => self.execute(op),
                        Err(message) => {
                            print_error(&message);
                            print_note("Type help for available commands");
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!();
                    print_note("(Interrupted - type quit to exit)");
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(e) => {
                    print_error(&format!("Input error: {}", e));
                    break;
                }
            }
        }

        print_note("Goodbye!");
        Ok(())
    }

    fn execute(&self, op: StoreOp) {
        let store = self.registry.get(self.target);
        let result = ops::execute(store, op)
            .map_err(anyhow::Error::from)
            .and_then(|output| ops::print_output(&output, self.json_output));
        if let Err(e) = result {
            print_error(&format!("{:#}", e));
        }
    }

    fn print_welcome(&self) {
        let dim = Style::new().dim();
        println!();
        println!("{}", style("Stowage Shell").bold().cyan());
        println!("{}", dim.apply_to("─".repeat(40)));
        println!(
            "{}",
            dim.apply_to("Both stores are open. The session store is dropped on exit.")
        );
        println!("{}", dim.apply_to("Use help for commands, Ctrl+D to exit."));
        println!();
    }
}

fn print_help() {
    let dim = Style::new().dim();
    println!();
    println!("{}", style("Available Commands").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    let rows = [
        ("set <key> <value>", "Store a value (JSON, else a string)"),
        ("setex <key> <ms> <value>", "Store a value that expires in <ms>"),
        ("get <key>", "Read a value"),
        ("rm <key>", "Remove a key"),
        ("has <key>", "Check whether a record is stored"),
        ("keys", "List keys in the namespace"),
        ("all", "Show every live value"),
        ("prune", "Delete expired and unreadable records"),
        ("size", "Show namespace usage"),
        ("clear", "Delete every key in the namespace"),
        ("use local|session", "Switch store"),
        ("quit, exit", "Leave the shell"),
    ];
    for (usage, about) in rows {
        println!("  {:<26} {}", style(usage).cyan(), about);
    }
    println!();
}

/// Split off the first whitespace-delimited word.
fn next_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.find(char::is_whitespace) {
        Some(end) => Some((&input[..end], input[end..].trim_start())),
        None => Some((input, "")),
    }
}

fn parse_line(line: &str) -> std::result::Result<ShellCommand, String> {
    let (cmd, rest) = next_word(line).ok_or_else(|| "empty command".to_string())?;

    let single_key = |usage: &str| -> std::result::Result<String, String> {
        match next_word(rest) {
            Some((key, "")) => Ok(key.to_string()),
            _ => Err(format!("usage: {}", usage)),
        }
    };
    let no_args = |command: ShellCommand| {
        if rest.is_empty() {
            Ok(command)
        } else {
            Err(format!("{} takes no arguments", cmd))
        }
    };

    match cmd {
        "quit" | "exit" | "q" => no_args(ShellCommand::Quit),
        "help" | "?" => no_args(ShellCommand::Help),
        "use" => match rest {
            "local" => Ok(ShellCommand::Use(StoreKind::Local)),
            "session" => Ok(ShellCommand::Use(StoreKind::Session)),
            _ => Err("usage: use local|session".to_string()),
        },
        "set" => match next_word(rest) {
            Some((key, value)) if !value.is_empty() => Ok(ShellCommand::Op(StoreOp::Set {
                key: key.to_string(),
                value: ops::parse_value(value),
                expire_ms: None,
            })),
            _ => Err("usage: set <key> <value>".to_string()),
        },
        "setex" => {
            let usage = "usage: setex <key> <ms> <value>".to_string();
            let (key, rest) = next_word(rest).ok_or_else(|| usage.clone())?;
            let (ms, value) = next_word(rest).ok_or_else(|| usage.clone())?;
            let ms: u64 = ms
                .parse()
                .map_err(|_| format!("invalid expiry '{}': expected milliseconds", ms))?;
            if value.is_empty() {
                return Err(usage);
            }
            Ok(ShellCommand::Op(StoreOp::Set {
                key: key.to_string(),
                value: ops::parse_value(value),
                expire_ms: Some(ms),
            }))
        }
        "get" => Ok(ShellCommand::Op(StoreOp::Get {
            key: single_key("get <key>")?,
            default: None,
        })),
        "rm" | "remove" => Ok(ShellCommand::Op(StoreOp::Remove {
            key: single_key("rm <key>")?,
        })),
        "has" => Ok(ShellCommand::Op(StoreOp::Has {
            key: single_key("has <key>")?,
        })),
        "keys" => no_args(ShellCommand::Op(StoreOp::Keys)),
        "all" => no_args(ShellCommand::Op(StoreOp::All)),
        "prune" => no_args(ShellCommand::Op(StoreOp::Prune)),
        "size" => no_args(ShellCommand::Op(StoreOp::Size)),
        "clear" => no_args(ShellCommand::Op(StoreOp::Clear)),
        other => Err(format!("Unknown command: {}", other)),
    }
}
