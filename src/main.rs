//! kvrealm - command-line access to a file-backed store
//!
//! Opens the snapshot file, runs one command against it, and exits.

use anyhow::{anyhow, Context};
use kvrealm::{Backend, Clock, Store, StoreConfig, Value, DEFAULT_DB_PATH};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// How `set` interprets its VALUE argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Text,
    Int,
    Float,
    Bool,
}

impl ValueKind {
    fn parse(s: &str) -> Result<Self, String> {
        match s {
            "text" => Ok(ValueKind::Text),
            "int" => Ok(ValueKind::Int),
            "float" => Ok(ValueKind::Float),
            "bool" => Ok(ValueKind::Bool),
            other => Err(format!("unknown value type '{}'", other)),
        }
    }

    /// Converts the raw argument into a stored value of this kind.
    fn value_of(self, raw: &str) -> anyhow::Result<Value> {
        let text = Value::from(raw);
        Ok(match self {
            ValueKind::Text => text,
            ValueKind::Int => Value::Integer(text.to::<i64>()?),
            ValueKind::Float => Value::Float(text.to::<f64>()?),
            ValueKind::Bool => Value::Bool(text.to::<bool>()?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Get {
        key: String,
    },
    GetInt {
        key: String,
    },
    Set {
        key: String,
        value: String,
        ttl: Option<u64>,
        kind: ValueKind,
    },
    Remove {
        key: String,
    },
    Keys {
        pattern: String,
    },
    Purge,
}

/// Command-line configuration
#[derive(Debug, Clone, PartialEq, Eq)]
struct Config {
    /// Snapshot file to open
    db: PathBuf,
    /// Log filter used when RUST_LOG is unset
    log: String,
    /// What to run
    command: Command,
}

#[derive(Debug, PartialEq, Eq)]
enum Parsed {
    Run(Config),
    Help,
    Version,
}

impl Config {
    /// Parse configuration from command-line arguments, exiting on error
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();

        match Self::parse(&args) {
            Ok(Parsed::Run(config)) => config,
            Ok(Parsed::Help) => {
                print_help();
                std::process::exit(0);
            }
            Ok(Parsed::Version) => {
                println!("kvrealm version {}", kvrealm::VERSION);
                std::process::exit(0);
            }
            Err(message) => {
                eprintln!("Error: {}", message);
                eprintln!("Run 'kvrealm --help' for usage.");
                std::process::exit(1);
            }
        }
    }

    fn parse(args: &[String]) -> Result<Parsed, String> {
        let mut db = PathBuf::from(DEFAULT_DB_PATH);
        let mut log = "warn".to_string();
        let mut ttl = None;
        let mut kind = ValueKind::Text;
        let mut positional = Vec::new();

        let mut i = 0;
        while i < args.len() {
            let value_index = i + 1;
            let flag_value = |name: &str| {
                args.get(value_index)
                    .cloned()
                    .ok_or_else(|| format!("{} requires a value", name))
            };

            match args[i].as_str() {
                "--db" | "-d" => {
                    db = PathBuf::from(flag_value("--db")?);
                    i += 2;
                }
                "--log" | "-l" => {
                    log = flag_value("--log")?;
                    i += 2;
                }
                "--ttl" => {
                    let secs = flag_value("--ttl")?;
                    ttl = Some(
                        secs.parse::<u64>()
                            .map_err(|_| format!("invalid ttl '{}'", secs))?,
                    );
                    i += 2;
                }
                "--type" | "-t" => {
                    kind = ValueKind::parse(&flag_value("--type")?)?;
                    i += 2;
                }
                "--help" | "-h" => return Ok(Parsed::Help),
                "--version" | "-v" => return Ok(Parsed::Version),
                flag if flag.starts_with("--") => {
                    return Err(format!("unknown argument: {}", flag));
                }
                arg => {
                    positional.push(arg.to_string());
                    i += 1;
                }
            }
        }

        let mut positional = positional.into_iter();
        let name = positional.next().ok_or("no command given")?;
        let mut next = |what: &str| {
            positional
                .next()
                .ok_or_else(|| format!("{} requires {}", name, what))
        };

        let command = match name.as_str() {
            "get" => Command::Get { key: next("KEY")? },
            "get-int" => Command::GetInt { key: next("KEY")? },
            "set" => Command::Set {
                key: next("KEY")?,
                value: next("VALUE")?,
                ttl,
                kind,
            },
            "remove" | "rm" => Command::Remove { key: next("KEY")? },
            "keys" => Command::Keys {
                pattern: next("PATTERN").unwrap_or_else(|_| "*".to_string()),
            },
            "purge" => Command::Purge,
            other => return Err(format!("unknown command: {}", other)),
        };

        if let Some(extra) = positional.next() {
            return Err(format!("unexpected argument: {}", extra));
        }

        Ok(Parsed::Run(Config { db, log, command }))
    }
}

fn print_help() {
    println!(
        r#"
kvrealm - Expiring Key-Value Record Store

USAGE:
    kvrealm [OPTIONS] <COMMAND>

COMMANDS:
    get <KEY>                  Print the value stored under KEY, or (nil)
    get-int <KEY>              Print the value converted to an integer
    set <KEY> <VALUE>          Store VALUE under KEY
    remove <KEY>               Remove KEY (prints 1 if removed, 0 otherwise)
    keys [PATTERN]             List live keys matching a glob (default: *)
    purge                      Delete every expired record

OPTIONS:
    -d, --db <PATH>            Store file (default: {db})
    -l, --log <FILTER>         Log filter when RUST_LOG is unset (default: warn)
        --ttl <SECONDS>        Expire the value after SECONDS (set only)
    -t, --type <TYPE>          Value type for set: text, int, float, bool
    -v, --version              Print version information
    -h, --help                 Print this help message

EXAMPLES:
    kvrealm set Username KewlSmith
    kvrealm set "Pin Code" 1234 --type int
    kvrealm set session abc123 --ttl 3600
    kvrealm keys "P*"
"#,
        db = DEFAULT_DB_PATH
    );
}

/// Runs one command and writes its output.
fn run<B: Backend, C: Clock>(
    store: &mut Store<B, C>,
    command: &Command,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    debug!(?command, "Running command");

    match command {
        Command::Get { key } => match store.get(key)? {
            Some(record) => writeln!(out, "{}", record.value)?,
            None => writeln!(out, "(nil)")?,
        },
        Command::GetInt { key } => {
            let value = store
                .get_as::<i64>(key)
                .with_context(|| format!("cannot read '{}' as an integer", key))?;
            writeln!(out, "{}", value)?;
        }
        Command::Set {
            key,
            value,
            ttl,
            kind,
        } => {
            let value = kind.value_of(value)?;
            match ttl {
                Some(secs) => store.set_with_ttl(key.as_str(), value, Duration::from_secs(*secs))?,
                None => store.set(key.as_str(), value)?,
            }
            writeln!(out, "OK")?;
        }
        Command::Remove { key } => {
            let removed = store.remove(key)?;
            writeln!(out, "{}", u8::from(removed))?;
        }
        Command::Keys { pattern } => {
            let keys = store.keys(pattern)?;
            if keys.is_empty() {
                writeln!(out, "(empty)")?;
            }
            for key in keys {
                writeln!(out, "{}", key)?;
            }
        }
        Command::Purge => {
            let purged = store.purge_expired()?;
            writeln!(out, "{}", purged)?;
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(io::stderr)
        .init();

    let store_config = StoreConfig::new(&config.db);
    let mut store = Store::open(&store_config)
        .with_context(|| format!("failed to open store at {}", config.db.display()))?;

    let stdout = io::stdout();
    let result = run(&mut store, &config.command, &mut stdout.lock());

    store
        .dispose()
        .map_err(|e| anyhow!("failed to close store: {}", e))?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvrealm::{ManualClock, MemoryBackend};
    use std::time::UNIX_EPOCH;

    fn args(line: &[&str]) -> Vec<String> {
        line.iter().map(|s| s.to_string()).collect()
    }

    fn run_config(line: &[&str]) -> Config {
        match Config::parse(&args(line)) {
            Ok(Parsed::Run(config)) => config,
            other => panic!("unexpected parse result: {:?}", other),
        }
    }

    fn output<B: Backend, C: Clock>(store: &mut Store<B, C>, line: &[&str]) -> String {
        let config = run_config(line);
        let mut out = Vec::new();
        run(store, &config.command, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_defaults() {
        let config = run_config(&["get", "Username"]);
        assert_eq!(config.db, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.log, "warn");
        assert_eq!(
            config.command,
            Command::Get {
                key: "Username".to_string()
            }
        );
    }

    #[test]
    fn test_parse_set_with_options() {
        let config = run_config(&[
            "--db", "/tmp/kv.json", "set", "Pin Code", "1234", "--type", "int", "--ttl", "60",
        ]);
        assert_eq!(config.db, PathBuf::from("/tmp/kv.json"));
        assert_eq!(
            config.command,
            Command::Set {
                key: "Pin Code".to_string(),
                value: "1234".to_string(),
                ttl: Some(60),
                kind: ValueKind::Int,
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Config::parse(&args(&[])).is_err());
        assert!(Config::parse(&args(&["get"])).is_err());
        assert!(Config::parse(&args(&["frobnicate"])).is_err());
        assert!(Config::parse(&args(&["get", "a", "b"])).is_err());
        assert!(Config::parse(&args(&["--ttl", "soon", "set", "a", "b"])).is_err());
        assert!(Config::parse(&args(&["--db"])).is_err());
        assert!(Config::parse(&args(&["--bogus", "get", "a"])).is_err());
        assert_eq!(Config::parse(&args(&["--help"])), Ok(Parsed::Help));
        assert_eq!(Config::parse(&args(&["-v"])), Ok(Parsed::Version));
    }

    #[test]
    fn test_keys_pattern_defaults_to_star() {
        let config = run_config(&["keys"]);
        assert_eq!(
            config.command,
            Command::Keys {
                pattern: "*".to_string()
            }
        );
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(ValueKind::Int.value_of("1234").unwrap(), Value::Integer(1234));
        assert_eq!(ValueKind::Bool.value_of("true").unwrap(), Value::Bool(true));
        assert_eq!(ValueKind::Float.value_of("2.5").unwrap(), Value::Float(2.5));
        assert_eq!(ValueKind::Text.value_of("1234").unwrap(), Value::from("1234"));
        assert!(ValueKind::Int.value_of("KewlSmith").is_err());
        assert!(ValueKind::parse("date").is_err());
    }

    #[test]
    fn test_run_commands() {
        let mut store = Store::in_memory();

        assert_eq!(output(&mut store, &["set", "Username", "KewlSmith"]), "OK\n");
        assert_eq!(output(&mut store, &["set", "Pin Code", "1234", "-t", "int"]), "OK\n");
        assert_eq!(output(&mut store, &["get", "Username"]), "KewlSmith\n");
        assert_eq!(output(&mut store, &["get-int", "Pin Code"]), "1234\n");
        assert_eq!(output(&mut store, &["get", "missing"]), "(nil)\n");
        assert_eq!(output(&mut store, &["keys"]), "Pin Code\nUsername\n");
        assert_eq!(output(&mut store, &["remove", "Username"]), "1\n");
        assert_eq!(output(&mut store, &["remove", "Username"]), "0\n");
        assert_eq!(output(&mut store, &["keys", "U*"]), "(empty)\n");
    }

    #[test]
    fn test_get_int_on_text_fails() {
        let mut store = Store::in_memory();
        store.set("Username", "KewlSmith").unwrap();

        let config = run_config(&["get-int", "Username"]);
        let mut out = Vec::new();
        assert!(run(&mut store, &config.command, &mut out).is_err());
    }

    #[test]
    fn test_set_with_huge_ttl_fails_cleanly() {
        let mut store = Store::in_memory();
        let config = run_config(&["set", "k", "v", "--ttl", "18446744073709551615"]);

        let mut out = Vec::new();
        assert!(run(&mut store, &config.command, &mut out).is_err());
        assert!(out.is_empty());
        assert_eq!(output(&mut store, &["get", "k"]), "(nil)\n");
    }

    #[test]
    fn test_ttl_and_purge() {
        let clock = ManualClock::new(UNIX_EPOCH);
        let mut store = Store::with_clock(MemoryBackend::new(), clock.clone());

        output(&mut store, &["set", "session", "abc123", "--ttl", "10"]);
        assert_eq!(output(&mut store, &["purge"]), "0\n");

        clock.advance(Duration::from_secs(10));
        assert_eq!(output(&mut store, &["purge"]), "1\n");
        assert_eq!(output(&mut store, &["get", "session"]), "(nil)\n");
    }
}
