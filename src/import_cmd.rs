//! Handlers for the `map`, `duplicates`, and `import` commands.

use anyhow::{Context, Result, anyhow};
use itertools::Itertools;
use log::{info, warn};

use crate::{
    apply::{ImportAction, ImportStrategy},
    cli::{DuplicatesArgs, ImportArgs, MapArgs, SourceArgs, TargetArgs},
    preview::load_source,
    profile::ImportProfile,
    session::ImportSession,
    store::Workspace,
    table,
};

struct Prepared {
    workspace: Workspace,
    session: ImportSession,
    profile: ImportProfile,
}

fn prepare(
    source: &SourceArgs,
    target: &TargetArgs,
    max_samples: Option<usize>,
) -> Result<Option<Prepared>> {
    let profile = match &target.profile {
        Some(path) => ImportProfile::load(path)?,
        None => ImportProfile::default(),
    };
    let Some(data) = load_source(source, profile.parse_mode)? else {
        info!("No data found in the source; nothing to do");
        return Ok(None);
    };
    if data.row_count() == 0 {
        info!("Source has a header row but no data rows; nothing to do");
        return Ok(None);
    }

    let workspace = Workspace::load(&target.workspace)?;
    let object_id = workspace
        .object(&target.object)
        .with_context(|| format!("Resolving object type in {:?}", target.workspace))?
        .id
        .clone();
    let samples = max_samples.unwrap_or_else(|| profile.max_samples());
    let mut session = ImportSession::new(&workspace, &object_id, data.normalized())?
        .with_max_samples(samples);

    let overrides = profile
        .column_overrides
        .iter()
        .map(|(header, field)| (header.as_str(), field.as_deref()))
        .chain(
            target
                .overrides
                .iter()
                .map(|(header, field)| (header.as_str(), field.as_deref())),
        );
    for (header, field) in overrides {
        let index = session
            .column_index(header)
            .ok_or_else(|| anyhow!("Mapping override names unknown column '{header}'"))?;
        session
            .set_mapping(index, field)
            .with_context(|| format!("Overriding mapping for column '{header}'"))?;
    }

    Ok(Some(Prepared {
        workspace,
        session,
        profile,
    }))
}

fn warn_incomplete_mapping(session: &ImportSession) {
    let unmapped = session.unmapped_columns();
    if !unmapped.is_empty() {
        warn!("{} column(s) are unmapped and will be ignored", unmapped.len());
    }
    let missing = session.missing_required_fields();
    if !missing.is_empty() {
        warn!(
            "{} required field(s) have no source column: {}",
            missing.len(),
            missing.iter().map(|f| f.api_name.as_str()).join(", ")
        );
    }
}

pub fn execute_map(args: &MapArgs) -> Result<()> {
    let Some(Prepared { session, .. }) = prepare(&args.source, &args.target, args.max_samples)?
    else {
        return Ok(());
    };

    let rows = session
        .mappings()
        .iter()
        .map(|m| {
            let (field, api_name, data_type) = match &m.target_field {
                Some(f) => (f.name.clone(), f.api_name.clone(), f.data_type.to_string()),
                None => ("(unmapped)".to_string(), String::new(), String::new()),
            };
            vec![
                (m.source_column_index + 1).to_string(),
                m.source_column_name.clone(),
                field,
                api_name,
                data_type,
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(
        &["#", "column", "field", "api_name", "type"].map(String::from),
        &rows,
    );

    let suggestions = session.suggest_fields();
    if !suggestions.is_empty() {
        println!();
        let rows = suggestions
            .iter()
            .map(|s| {
                vec![
                    s.column_name.clone(),
                    s.api_name.clone(),
                    s.data_type.to_string(),
                ]
            })
            .collect::<Vec<_>>();
        table::print_table(
            &["unmapped column", "suggested api_name", "suggested type"].map(String::from),
            &rows,
        );
    }
    warn_incomplete_mapping(&session);
    info!(
        "{} of {} column(s) mapped",
        session.mappings().len() - session.unmapped_columns().len(),
        session.mappings().len()
    );
    Ok(())
}

pub fn execute_duplicates(args: &DuplicatesArgs) -> Result<()> {
    let Some(Prepared {
        workspace,
        session,
        profile,
    }) = prepare(&args.source, &args.target, None)?
    else {
        return Ok(());
    };
    let strategy = ImportStrategy {
        match_field_api_name: args.match_field.clone().or(profile.match_field),
        ..ImportStrategy::default()
    };
    let mut session = session.with_strategy(strategy);
    let matches = session
        .check_duplicates(&workspace)
        .context("Checking for duplicates")?;

    if matches.is_empty() {
        println!("No duplicates found.");
        return Ok(());
    }
    let rows = matches
        .iter()
        .map(|m| {
            vec![
                (m.import_row_index + 1).to_string(),
                m.existing_record_id.clone(),
                m.match_type.as_str().to_string(),
                m.matching_fields
                    .iter()
                    .map(|f| format!("{}: {} = {}", f.field_name, f.import_value, f.existing_value))
                    .join("; "),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&["row", "record", "match", "fields"].map(String::from), &rows);
    Ok(())
}

pub fn execute_import(args: &ImportArgs) -> Result<()> {
    let Some(Prepared {
        mut workspace,
        session,
        profile,
    }) = prepare(&args.source, &args.target, args.max_samples)?
    else {
        return Ok(());
    };
    let strategy = ImportStrategy {
        match_field_api_name: args.match_field.clone().or(profile.match_field),
        on_duplicate: args
            .on_duplicate
            .or(profile.on_duplicate)
            .unwrap_or_default(),
    };
    info!(
        "Importing into '{}' (on duplicate: {:?})",
        session.object_type_id(),
        strategy.on_duplicate
    );
    let mut session = session.with_strategy(strategy);

    if args.create_missing || profile.create_missing_fields {
        let created = session
            .create_missing_fields(&mut workspace)
            .context("Creating fields for unmapped columns")?;
        info!("Created {} field(s)", created.len());
    }
    warn_incomplete_mapping(&session);

    session
        .check_duplicates(&workspace)
        .context("Checking for duplicates")?;

    if args.dry_run {
        let rows = session
            .decisions()
            .iter()
            .map(|d| {
                vec![
                    (d.row_index + 1).to_string(),
                    d.action.to_string(),
                    d.target_record_id.clone().unwrap_or_default(),
                    d.field_values
                        .iter()
                        .map(|(api, value)| format!("{api}={value}"))
                        .join(", "),
                ]
            })
            .collect::<Vec<_>>();
        table::print_table(&["row", "action", "record", "values"].map(String::from), &rows);
        info!("Dry run; workspace left unchanged");
        return Ok(());
    }

    let outcome = session.apply(&mut workspace);
    workspace
        .save(&args.target.workspace)
        .with_context(|| format!("Saving workspace {:?}", args.target.workspace))?;
    match outcome {
        Ok(summary) => {
            println!(
                "Created {}, updated {}, skipped {} row(s).",
                summary.created, summary.updated, summary.skipped
            );
            Ok(())
        }
        Err(err) => {
            let applied = &err.applied;
            warn!(
                "Stopped after {} created and {} updated row(s); those rows remain applied",
                applied.created, applied.updated
            );
            let action = match err.action {
                ImportAction::Create => "creating",
                ImportAction::Update => "updating",
                ImportAction::Skip => "skipping",
            };
            Err(anyhow::Error::new(err).context(format!("Import failed while {action} a record")))
        }
    }
}
