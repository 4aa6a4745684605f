use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::{ParseArgs, SourceArgs},
    io_utils,
    tabular::{self, ParseMode, TabularData},
    table,
};

pub fn execute(args: &ParseArgs) -> Result<()> {
    let Some(data) = load_source(&args.source, None)? else {
        info!("No data found in the source");
        return Ok(());
    };
    let rows = data.rows.iter().take(args.rows).cloned().collect::<Vec<_>>();
    table::print_table(&data.headers, &rows);
    info!(
        "Parsed {} column(s) and {} row(s); displayed {}",
        data.column_count(),
        data.row_count(),
        rows.len()
    );
    Ok(())
}

/// Reads pasted text or scraped tables; `Ok(None)` means there was nothing to import.
pub(crate) fn load_source(
    source: &SourceArgs,
    profile_mode: Option<ParseMode>,
) -> Result<Option<TabularData>> {
    if let Some(path) = &source.tables {
        let candidates = io_utils::read_table_candidates(path)?;
        info!("Found {} table(s) in {path:?}", candidates.len());
        let data = tabular::select_table(&candidates, source.table_index)
            .with_context(|| format!("Selecting a table from {path:?}"))?;
        return Ok((!data.is_empty()).then_some(data));
    }

    let Some(path) = &source.input else {
        return Ok(None);
    };
    let encoding = io_utils::resolve_encoding(source.input_encoding.as_deref())?;
    let text = io_utils::read_text(path, encoding)?;
    let mode = source.parse_mode.or(profile_mode).unwrap_or_default();
    if let Some(first_line) = text.trim().lines().next() {
        info!(
            "Parsing '{}' with delimiter '{}' ({mode:?} mode)",
            path.display(),
            crate::printable_delimiter(tabular::detect_delimiter(first_line))
        );
    }
    tabular::parse_with(&text, mode).with_context(|| format!("Parsing {path:?}"))
}
