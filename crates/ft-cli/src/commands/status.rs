//! Status command for showing tracked users.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use ft_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    let rows = db.list_user_stats()?;

    writeln!(writer, "Focus tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;

    if rows.is_empty() {
        writeln!(writer, "No stats recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Users:")?;
    for row in rows {
        writeln!(
            writer,
            "- {}: {} session(s), last update {}",
            row.user_id, row.version, row.updated_at
        )?;
    }

    Ok(())
}
