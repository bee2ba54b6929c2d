use crate::output::{Output, OutputFormat};
use anisync_config::PathManager;
use anisync_core::ErrorLedger;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use serde_json::json;

pub fn run_ledger(output: &Output) -> Result<()> {
    let ledger_file = PathManager::default().error_ledger_file();
    let ledger = ErrorLedger::load(&ledger_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read error ledger {}: {}", ledger_file.display(), e))?;

    match output.format() {
        OutputFormat::Human => {
            if ledger.is_empty() {
                output.success("Error ledger is empty");
                return Ok(());
            }
            if output.is_quiet() {
                return Ok(());
            }

            let mut table = Table::new();
            table.set_header(vec![
                Cell::new("TVDB ID").add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Title").add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Seasons").add_attribute(comfy_table::Attribute::Bold),
            ]);
            for (local_id, entry) in ledger.entries() {
                table.add_row(vec![local_id.clone(), entry.title.clone(), entry.seasons.join(", ")]);
            }
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", table);
            output.info(format!(
                "{} shows need attention. Entries starting with 'anilist:' have no Plex counterpart.",
                ledger.len()
            ));
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "file": ledger_file.display().to_string(),
                "entries": ledger.entries(),
            }));
        }
    }
    Ok(())
}
