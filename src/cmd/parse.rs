use crate::parser::parse_inserts;
use std::path::PathBuf;

pub fn run(file: PathBuf, json: bool) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("input file does not exist: {}", file.display());
    }

    let sql = std::fs::read_to_string(&file)?;
    let statements = parse_inserts(&sql);

    if statements.is_empty() {
        eprintln!("No INSERT INTO ... VALUES statement found in {}", file.display());
        return Ok(());
    }

    if json {
        let records: Vec<_> = statements.iter().flat_map(|s| s.records.iter()).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!(
        "{:<40} {:>8} {:>8} {:>8}",
        "Table", "Columns", "Rows", "Skipped"
    );
    println!("{}", "─".repeat(67));
    for stmt in &statements {
        println!(
            "{:<40} {:>8} {:>8} {:>8}",
            stmt.table,
            stmt.columns.len(),
            stmt.records.len(),
            stmt.skipped
        );
    }

    if let Some(first) = statements.iter().flat_map(|s| s.records.first()).next() {
        println!();
        println!("First row:");
        println!("{}", serde_json::to_string_pretty(first)?);
    }

    Ok(())
}
