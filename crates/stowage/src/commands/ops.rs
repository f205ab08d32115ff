//! Store operations shared by one-shot commands and the shell.

use std::collections::BTreeMap;

use anyhow::Result;
use console::Style;
use serde_json::{Value, json};
use stowage_store::{NamespacedStore, SetOptions, StoreStats};

/// One operation against a store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Set {
        key: String,
        value: Value,
        expire_ms: Option<u64>,
    },
    Get {
        key: String,
        default: Option<Value>,
    },
    Remove {
        key: String,
    },
    Has {
        key: String,
    },
    Keys,
    All,
    Prune,
    Size,
    Clear,
}

/// What an operation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum OpOutput {
    Stored { key: String },
    Value { key: String, value: Option<Value> },
    Removed { key: String },
    Presence { key: String, present: bool },
    Keys(Vec<String>),
    Entries(BTreeMap<String, Value>),
    Pruned(usize),
    Size(StoreStats),
    Cleared(usize),
}

/// Parse a command-line value: JSON if it parses, else a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Run `op` against `store`.
pub fn execute(store: &NamespacedStore, op: StoreOp) -> stowage_store::Result<OpOutput> {
    let output = match op {
        StoreOp::Set {
            key,
            value,
            expire_ms,
        } => {
            let options = match expire_ms {
                Some(ms) => SetOptions::new().with_expire_millis(ms),
                None => SetOptions::new(),
            };
            store.set(&key, &value, &options)?;
            OpOutput::Stored { key }
        }
        StoreOp::Get { key, default } => {
            let value = store.get::<Value>(&key).or(default);
            OpOutput::Value { key, value }
        }
        StoreOp::Remove { key } => {
            store.remove(&key)?;
            OpOutput::Removed { key }
        }
        StoreOp::Has { key } => {
            let present = store.has(&key);
            OpOutput::Presence { key, present }
        }
        StoreOp::Keys => OpOutput::Keys(store.get_keys()),
        StoreOp::All => OpOutput::Entries(store.get_all()),
        StoreOp::Prune => OpOutput::Pruned(store.clear_expired()?),
        StoreOp::Size => OpOutput::Size(store.stats()),
        StoreOp::Clear => OpOutput::Cleared(store.clear()?),
    };
    Ok(output)
}

/// Print an operation's output to stdout.
///
/// Plain mode prints string values bare so they can be piped.
pub fn print_output(output: &OpOutput, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(&to_json(output))?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let green = Style::new().green();

    match output {
        OpOutput::Stored { key } => println!("{} Stored {}", green.apply_to("✓"), key),
        OpOutput::Value { value: Some(value), .. } => println!("{}", display_value(value)),
        OpOutput::Value { key, value: None } => {
            eprintln!("{}", dim.apply_to(format!("No value for '{}'", key)));
        }
        OpOutput::Removed { key } => println!("{} Removed {}", green.apply_to("✓"), key),
        OpOutput::Presence { present, .. } => println!("{}", present),
        OpOutput::Keys(keys) if keys.is_empty() => {
            eprintln!("{}", dim.apply_to("No keys"));
        }
        OpOutput::Keys(keys) => {
            for key in keys {
                println!("{}", key);
            }
        }
        OpOutput::Entries(entries) if entries.is_empty() => {
            eprintln!("{}", dim.apply_to("No entries"));
        }
        OpOutput::Entries(entries) => {
            for (key, value) in entries {
                println!("{} = {}", key, value);
            }
        }
        OpOutput::Pruned(count) => println!("Pruned {} record(s)", count),
        OpOutput::Size(stats) => {
            println!("{} bytes across {} key(s)", stats.size, stats.keys);
            println!(
                "{}",
                dim.apply_to(format!(
                    "{} live, {} expired, {} unreadable",
                    stats.live, stats.expired, stats.corrupt
                ))
            );
        }
        OpOutput::Cleared(count) => println!("Cleared {} key(s)", count),
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_json(output: &OpOutput) -> Value {
    match output {
        OpOutput::Stored { key } => json!({ "stored": key }),
        OpOutput::Value { key, value } => json!({
            "key": key,
            "found": value.is_some(),
            "value": value,
        }),
        OpOutput::Removed { key } => json!({ "removed": key }),
        OpOutput::Presence { key, present } => json!({ "key": key, "present": present }),
        OpOutput::Keys(keys) => json!(keys),
        OpOutput::Entries(entries) => json!(entries),
        OpOutput::Pruned(count) => json!({ "pruned": count }),
        OpOutput::Size(stats) => json!(stats),
        OpOutput::Cleared(count) => json!({ "cleared": count }),
    }
}
