//! Spreadsheet backend: one tab per table, rows `[id, clinicId, data]`.

mod auth;
mod client;

pub use auth::{ServiceAccount, ServiceAccountAuth, GOOGLE_TOKEN_URI, SHEETS_SCOPE};
pub use client::{column_letter, SheetsClient, SHEETS_API};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::store::{record_id, str_field, RowPredicate, RowUpdate, TableStore};
use crate::table::Table;

pub const HEADERS: [&str; 3] = ["id", "clinicId", "data"];

#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    /// 1-based row number in the tab (the header is row 1).
    pub row_number: usize,
    pub item: Value,
}

/// Decode the tab's rows, header included. Rows with an empty data cell or
/// unparseable JSON are skipped; `id` and `clinicId` missing from the JSON
/// are taken from their columns.
pub fn parse_rows(sheet: &str, rows: &[Vec<String>]) -> Vec<SheetRow> {
    let mut out = Vec::new();

    for (idx, row) in rows.iter().enumerate().skip(1) {
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
        let data = cell(2);
        if data.trim().is_empty() {
            continue;
        }

        let mut item: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                warn!(sheet, row = idx + 1, error = %e, "skipping row with unreadable data");
                continue;
            }
        };

        let Some(obj) = item.as_object_mut() else {
            warn!(sheet, row = idx + 1, "skipping row whose data is not an object");
            continue;
        };
        for (col, key) in [(0, "id"), (1, "clinicId")] {
            let missing = obj.get(key).map_or(true, |v| v.is_null() || v == "");
            if missing && !cell(col).is_empty() {
                obj.insert(key.to_string(), Value::String(cell(col).to_string()));
            }
        }

        out.push(SheetRow {
            row_number: idx + 1,
            item,
        });
    }

    out
}

pub fn encode_row(item: &Value) -> StoreResult<Vec<String>> {
    let id = record_id(item)?.to_string();
    let clinic = str_field(item, "clinicId").unwrap_or_default().to_string();
    Ok(vec![id, clinic, serde_json::to_string(item)?])
}

pub struct SheetsTableStore {
    client: Arc<SheetsClient>,
    locks: HashMap<Table, Mutex<()>>,
}

impl SheetsTableStore {
    pub fn new(client: Arc<SheetsClient>) -> Self {
        Self {
            client,
            locks: Table::ALL.into_iter().map(|t| (t, Mutex::new(()))).collect(),
        }
    }

    async fn read(&self, table: Table) -> StoreResult<(i64, Vec<SheetRow>)> {
        let sheet = table.sheet_name();
        let sheet_id = self.client.ensure_sheet(sheet, &HEADERS).await?;
        let raw = self.client.get_values(&format!("{sheet}!A:C")).await?;
        Ok((sheet_id, parse_rows(sheet, &raw)))
    }
}

#[async_trait]
impl TableStore for SheetsTableStore {
    fn backend_name(&self) -> &'static str {
        "sheets"
    }

    async fn load(&self, table: Table) -> StoreResult<Vec<Value>> {
        let (_, rows) = self.read(table).await?;
        Ok(rows.into_iter().map(|r| r.item).collect())
    }

    async fn upsert(&self, table: Table, item: Value) -> StoreResult<Value> {
        let encoded = encode_row(&item)?;
        let _guard = self.locks[&table].lock().await;

        let (_, rows) = self.read(table).await?;
        let sheet = table.sheet_name();
        let existing = rows
            .iter()
            .find(|r| str_field(&r.item, "id") == Some(encoded[0].as_str()));

        match existing {
            Some(row) => {
                let range = format!("{sheet}!A{n}:C{n}", n = row.row_number);
                self.client.update_values(&range, vec![encoded]).await?;
                debug!(sheet, row = row.row_number, "sheet row updated");
            }
            None => {
                self.client
                    .append_values(&format!("{sheet}!A:C"), vec![encoded])
                    .await?;
                debug!(sheet, "sheet row appended");
            }
        }
        Ok(item)
    }

    async fn delete_where(&self, table: Table, predicate: RowPredicate<'_>) -> StoreResult<usize> {
        let _guard = self.locks[&table].lock().await;

        let (sheet_id, rows) = self.read(table).await?;
        let doomed: Vec<usize> = rows
            .iter()
            .filter(|r| predicate(&r.item))
            .map(|r| r.row_number)
            .collect();

        self.client.delete_rows(sheet_id, &doomed).await?;
        debug!(sheet = table.sheet_name(), removed = doomed.len(), "sheet rows deleted");
        Ok(doomed.len())
    }

    async fn update(
        &self,
        table: Table,
        predicate: RowPredicate<'_>,
        apply: RowUpdate<'_>,
    ) -> StoreResult<Option<Value>> {
        let _guard = self.locks[&table].lock().await;

        let (_, rows) = self.read(table).await?;
        let Some(row) = rows.into_iter().find(|r| predicate(&r.item)) else {
            return Ok(None);
        };
        let updated = apply(row.item)?;
        let encoded = encode_row(&updated)?;

        let sheet = table.sheet_name();
        let range = format!("{sheet}!A{n}:C{n}", n = row.row_number);
        self.client.update_values(&range, vec![encoded]).await?;
        debug!(sheet, row = row.row_number, "sheet row rewritten");
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn rows_backfill_ids_and_skip_junk() {
        let raw = vec![
            row(&["id", "clinicId", "data"]),
            row(&["p1", "c1", r#"{"name":"Dana"}"#]),
            row(&["p2", "c1", ""]),
            row(&["p3", "c1", "{broken"]),
            row(&["p4", "c2", r#"{"id":"p4","clinicId":"c2","name":"Erlan"}"#]),
            row(&["p5"]),
            row(&["p6", "c1", "[1,2]"]),
        ];

        let parsed = parse_rows("Patients", &raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].row_number, 2);
        assert_eq!(parsed[0].item, json!({"id": "p1", "clinicId": "c1", "name": "Dana"}));
        assert_eq!(parsed[1].row_number, 5);
        assert_eq!(parsed[1].item["name"], "Erlan");
    }

    #[test]
    fn header_only_sheet_is_empty() {
        assert!(parse_rows("Visits", &[row(&HEADERS)]).is_empty());
        assert!(parse_rows("Visits", &[]).is_empty());
    }

    #[test]
    fn encoded_rows_mirror_id_and_clinic() {
        let item = json!({"id": "v1", "clinicId": "c9", "cost": 100});
        let cells = encode_row(&item).unwrap();
        assert_eq!(cells[0], "v1");
        assert_eq!(cells[1], "c9");
        let back: Value = serde_json::from_str(&cells[2]).unwrap();
        assert_eq!(back, item);

        assert!(encode_row(&json!({"clinicId": "c9"})).is_err());
    }
}
