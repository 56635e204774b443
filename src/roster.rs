// 📋 Roster Import - Provision a class from a student-number/name CSV
//
// Re-running the same file is safe: ids already present are skipped and
// counted, never overwritten.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db;
use crate::model::Student;

/// One roster line: externally assigned student number and display name.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterRow {
    #[serde(rename = "Student_Number")]
    pub id: String,

    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

pub fn load_roster(csv_path: &Path) -> Result<Vec<RosterRow>> {
    let file = std::fs::File::open(csv_path).context("Failed to open roster CSV")?;
    parse_roster(file)
}

pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<RosterRow>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: RosterRow = result.context("Failed to deserialize roster row")?;
        rows.push(row);
    }

    Ok(rows)
}

/// Create one student per roster row, all with zeroed balances and the
/// given starting salary. Duplicate student numbers are skipped.
pub fn import_roster(
    conn: &Connection,
    session_code: &str,
    salary: i64,
    rows: &[RosterRow],
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for row in rows {
        let student = Student {
            id: row.id.clone(),
            name: row.name.clone(),
            session_code: session_code.to_string(),
            salary,
            cash: 0,
            bank: 0,
            brokerage: 0,
        };

        match db::insert_student(conn, &student) {
            Ok(()) => summary.imported += 1,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                summary.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;

    const ROSTER_CSV: &str = "\
Student_Number,Name
10432,Alice Chen
10433,Bob Ruiz
10434,Cara Novak
";

    #[test]
    fn test_parse_roster_csv() {
        let rows = parse_roster(ROSTER_CSV.as_bytes()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, "10432");
        assert_eq!(rows[0].name, "Alice Chen");
        assert_eq!(rows[2].name, "Cara Novak");
    }

    #[test]
    fn test_import_is_idempotent() {
        let conn = test_conn();
        let rows = parse_roster(ROSTER_CSV.as_bytes()).unwrap();

        let first = import_roster(&conn, "ABCD", 1500, &rows).unwrap();
        assert_eq!(
            first,
            ImportSummary {
                imported: 3,
                skipped: 0
            }
        );

        // Re-running the same file inserts nothing new
        let second = import_roster(&conn, "ABCD", 1500, &rows).unwrap();
        assert_eq!(
            second,
            ImportSummary {
                imported: 0,
                skipped: 3
            }
        );

        let students = db::list_students(&conn, "ABCD").unwrap();
        assert_eq!(students.len(), 3);
        assert!(students.iter().all(|s| s.salary == 1500 && s.cash == 0));
    }
}
