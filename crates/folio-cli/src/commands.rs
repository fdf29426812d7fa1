use anyhow::{bail, Context};
use colored::Colorize;
use folio_entries::{Entries, FetchOptions, Fetched, Fields, Settings, Value};
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli)?;
    if matches!(cli.command, Command::Config) {
        print!("{}", settings.to_toml_string()?);
        return Ok(());
    }
    let entries = Entries::open(settings);
    let format = cli.format;

    match cli.command {
        Command::Create(args) => cmd_create(&entries, args),
        Command::Update(args) => cmd_update(&entries, args),
        Command::Delete(args) => report(format, "deleted", &args.id, entries.delete(&args.id)?),
        Command::Has(args) => {
            let found = entries.has(&args.id)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "id": args.id, "exists": found })),
                OutputFormat::Text if found => println!("{} {}", "✓".green(), args.id.bold()),
                OutputFormat::Text => println!("{} {} not found", "✗".red(), args.id.bold()),
            }
            Ok(())
        }
        Command::Copy(args) => {
            let ok = entries.copy(&args.id, &args.new_id)?;
            report(format, "copied", &format!("{} → {}", args.id, args.new_id), ok)
        }
        Command::Move(args) => {
            let ok = entries.move_entry(&args.id, &args.new_id)?;
            report(format, "moved", &format!("{} → {}", args.id, args.new_id), ok)
        }
        Command::Fetch(args) => cmd_fetch(&entries, args, format),
        Command::CacheId(args) => {
            let id = entries.cache_id(&args.id)?;
            if id.is_empty() {
                println!("{}", "(cache disabled or entry missing)".dimmed());
            } else {
                println!("{id}");
            }
            Ok(())
        }
        Command::Config => Ok(()),
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(root) = &cli.root {
        settings.root = root.clone();
    }
    if cli.no_cache {
        settings.cache.enabled = false;
    }
    debug!(
        config = ?cli.config,
        root = %settings.root.display(),
        cache = settings.cache.enabled,
        "settings loaded"
    );
    Ok(settings)
}

fn cmd_create(entries: &Entries, args: CreateArgs) -> anyhow::Result<()> {
    let mut fields = parse_fields(&args.fields)?;
    if let Some(body) = args.body {
        fields.insert("content".into(), Value::String(body));
    }
    if entries.create(&args.id, fields)? {
        println!("{} Created {}", "✓".green().bold(), args.id.bold());
        let location = entries.locate(&args.id)?;
        println!("  {}", location.document.display().to_string().dimmed());
    } else {
        bail!("entry {} already exists", args.id);
    }
    Ok(())
}

fn cmd_update(entries: &Entries, args: UpdateArgs) -> anyhow::Result<()> {
    let fields = parse_fields(&args.fields)?;
    let count = fields.len();
    if entries.update(&args.id, fields)? {
        println!("{} Updated {} ({count} fields)", "✓".green().bold(), args.id.bold());
    } else {
        bail!("entry {} not found", args.id);
    }
    Ok(())
}

fn cmd_fetch(entries: &Entries, args: FetchArgs, format: OutputFormat) -> anyhow::Result<()> {
    let options = FetchOptions {
        collection: args.collection,
        recursive: args.recursive,
        sort_by: args.sort_by,
        descending: args.desc,
        offset: args.offset.unwrap_or(0),
        limit: args.limit,
    };
    let fetched = entries.fetch(&args.id, options)?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&fetched.to_value())?);
        return Ok(());
    }
    if fetched.is_empty() {
        println!("{} {}", "No entries at".dimmed(), args.id.bold());
        return Ok(());
    }
    match &fetched {
        Fetched::Single(flat) => {
            for (key, value) in flat {
                println!("{}: {}", key.cyan(), display(value));
            }
        }
        Fetched::Collection(collection) => {
            for (id, fields) in collection.iter() {
                let title = fields.get("title").map(display).unwrap_or_default();
                println!("{}  {}", id.yellow().bold(), title);
            }
            println!("{}", format!("{} entries", collection.len()).dimmed());
        }
    }
    Ok(())
}

fn report(format: OutputFormat, verb: &str, subject: &str, ok: bool) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::json!({ "subject": subject, verb: ok }));
        return Ok(());
    }
    if ok {
        println!("{} {} {}", "✓".green().bold(), capitalize(verb), subject.bold());
    } else {
        println!("{} Not {}: {}", "✗".red().bold(), verb, subject.bold());
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse `key=value` pairs; values are YAML scalars (`true`, `3`, `text`).
fn parse_fields(raw: &[String]) -> anyhow::Result<Fields> {
    let mut fields = Fields::new();
    for pair in raw {
        let (key, value) = parse_field(pair)?;
        fields.insert(key, value);
    }
    Ok(fields)
}

fn parse_field(pair: &str) -> anyhow::Result<(String, Value)> {
    let Some((key, raw)) = pair.split_once('=') else {
        bail!("expected KEY=VALUE, got `{pair}`");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("empty field name in `{pair}`");
    }
    let value = if raw.trim().is_empty() {
        Value::String(raw.to_string())
    } else {
        serde_yaml_ng::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_values_are_yaml_scalars() {
        assert_eq!(parse_field("draft=true").unwrap(), ("draft".into(), json!(true)));
        assert_eq!(parse_field("order=3").unwrap(), ("order".into(), json!(3)));
        assert_eq!(parse_field("title=Hello world").unwrap().1, json!("Hello world"));
        assert_eq!(parse_field("tags=[a, b]").unwrap().1, json!(["a", "b"]));
        assert_eq!(parse_field("note=").unwrap().1, json!(""));
        assert_eq!(parse_field("eq=a=b").unwrap().1, json!("a=b"));
    }

    #[test]
    fn malformed_pairs_are_rejected() {
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn fetch_arrangement_flags_need_collection() {
        use clap::Parser;

        let cli = Cli::try_parse_from([
            "folio", "fetch", "blog", "--collection", "--sort-by", "published_at", "--desc",
            "--limit", "5",
        ])
        .unwrap();
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.sort_by.as_deref(), Some("published_at"));
        assert!(args.desc);
        assert_eq!(args.limit, Some(5));
        assert_eq!(args.offset, None);

        assert!(Cli::try_parse_from(["folio", "fetch", "blog", "--limit", "5"]).is_err());
    }

    #[test]
    fn every_global_option_has_help() {
        use clap::CommandFactory;

        let cmd = Cli::command();
        cmd.clone().debug_assert();
        for arg in cmd.get_arguments().filter(|a| a.is_global_set()) {
            assert!(arg.get_help().is_some(), "--{} has no help", arg.get_id());
        }
    }

    #[test]
    fn capitalize_verbs() {
        assert_eq!(capitalize("moved"), "Moved");
        assert_eq!(capitalize(""), "");
    }
}
