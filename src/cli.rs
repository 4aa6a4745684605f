use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{apply::OnDuplicate, tabular::ParseMode};

#[derive(Debug, Parser)]
#[command(author, version, about = "Import tabular data into custom-object records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse pasted text or a scraped table and preview the result
    Parse(ParseArgs),
    /// Show how source columns map onto an object's fields
    Map(MapArgs),
    /// List rows that look like records already in the workspace
    Duplicates(DuplicatesArgs),
    /// Map, de-duplicate, and write rows into the workspace
    Import(ImportArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Comma- or tab-delimited text file ('-' for stdin)
    #[arg(
        short = 'i',
        long = "input",
        required_unless_present = "tables",
        conflicts_with = "tables"
    )]
    pub input: Option<PathBuf>,
    /// JSON array of scraped `{headers, rows}` tables
    #[arg(long = "tables")]
    pub tables: Option<PathBuf>,
    /// Which scraped table to use when several were found (0-based)
    #[arg(long = "table-index", requires = "tables")]
    pub table_index: Option<usize>,
    /// Tokenizer for delimited text (legacy splits naively, quoted honours CSV quotes)
    #[arg(long = "parse-mode", value_enum)]
    pub parse_mode: Option<ParseMode>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Workspace JSON file holding object types, fields, and records
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,
    /// Target object type (id or name)
    #[arg(short = 't', long = "object")]
    pub object: String,
    /// Override a column mapping as `Header=api_name` (`Header=` leaves it unmapped)
    #[arg(long = "map", action = clap::ArgAction::Append, value_parser = parse_override)]
    pub overrides: Vec<(String, Option<String>)>,
    /// YAML import profile
    #[arg(long = "profile")]
    pub profile: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct MapArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub target: TargetArgs,
    /// Rows sampled per column when suggesting field types
    #[arg(long = "max-samples")]
    pub max_samples: Option<usize>,
}

#[derive(Debug, Args)]
pub struct DuplicatesArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub target: TargetArgs,
    /// Field api name that identifies a record on its own
    #[arg(long = "match-field")]
    pub match_field: Option<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub target: TargetArgs,
    /// Field api name that identifies a record on its own
    #[arg(long = "match-field")]
    pub match_field: Option<String>,
    /// What to do with rows that match an existing record
    #[arg(long = "on-duplicate", value_enum)]
    pub on_duplicate: Option<OnDuplicate>,
    /// Create fields (with guessed types) for unmapped columns
    #[arg(long = "create-missing")]
    pub create_missing: bool,
    /// Rows sampled per column when guessing types for new fields
    #[arg(long = "max-samples")]
    pub max_samples: Option<usize>,
    /// Print the per-row decisions without writing the workspace
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// Splits a `Header=api_name` override; an empty right side clears the mapping.
pub fn parse_override(value: &str) -> Result<(String, Option<String>), String> {
    let (header, field) = value
        .split_once('=')
        .ok_or_else(|| format!("Mapping override '{value}' must look like Header=api_name"))?;
    let header = header.trim();
    if header.is_empty() {
        return Err(format!("Mapping override '{value}' is missing a header"));
    }
    let field = field.trim();
    Ok((
        header.to_string(),
        (!field.is_empty()).then(|| field.to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_override_accepts_clearing() {
        assert_eq!(
            parse_override(" E-mail = email ").unwrap(),
            ("E-mail".to_string(), Some("email".to_string()))
        );
        assert_eq!(parse_override("Notes=").unwrap(), ("Notes".to_string(), None));
        assert!(parse_override("Notes").is_err());
        assert!(parse_override("=email").is_err());
    }

    #[test]
    fn import_args_parse_flags() {
        let cli = Cli::try_parse_from([
            "object-import",
            "import",
            "-i",
            "leads.csv",
            "-w",
            "ws.json",
            "-t",
            "Lead",
            "--on-duplicate",
            "skip",
            "--map",
            "E-mail=email",
            "--create-missing",
        ])
        .unwrap();
        let Commands::Import(args) = cli.command else {
            panic!("expected import command");
        };
        assert_eq!(args.on_duplicate, Some(OnDuplicate::Skip));
        assert_eq!(
            args.target.overrides,
            vec![("E-mail".to_string(), Some("email".to_string()))]
        );
        assert!(args.create_missing);
        assert!(!args.dry_run);
    }

    #[test]
    fn source_requires_input_or_tables() {
        assert!(Cli::try_parse_from(["object-import", "parse"]).is_err());
        assert!(
            Cli::try_parse_from(["object-import", "parse", "--tables", "t.json", "--table-index", "1"])
                .is_ok()
        );
    }
}
