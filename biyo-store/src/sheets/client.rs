//! Thin Google Sheets v4 client: just the calls the row store needs.

use std::collections::{HashMap, HashSet};

use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::auth::{ServiceAccount, ServiceAccountAuth};
use crate::error::{StoreError, StoreResult};

pub const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// 1-based column index to its letter name: 1 → A, 26 → Z, 27 → AA.
pub fn column_letter(index: usize) -> String {
    let mut n = index;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub struct SheetsClient {
    http: Client,
    auth: ServiceAccountAuth,
    spreadsheet_id: String,
    base_url: String,
    sheet_ids: Mutex<HashMap<String, i64>>,
    headers_checked: Mutex<HashSet<String>>,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, account: ServiceAccount) -> Self {
        let http = Client::new();
        Self {
            auth: ServiceAccountAuth::new(account, http.clone()),
            http,
            spreadsheet_id: spreadsheet_id.into(),
            base_url: SHEETS_API.to_string(),
            sheet_ids: Mutex::new(HashMap::new()),
            headers_checked: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/{}/values/{}{suffix}",
            self.base_url,
            self.spreadsheet_id,
            urlencoding::encode(range)
        )
    }

    async fn request(&self, method: Method, url: String) -> StoreResult<RequestBuilder> {
        let token = self.auth.access_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send(builder: RequestBuilder) -> StoreResult<Value> {
        let res = builder.send().await?;
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn batch_update(&self, requests: Vec<Value>) -> StoreResult<Value> {
        let url = format!("{}/{}:batchUpdate", self.base_url, self.spreadsheet_id);
        let req = self
            .request(Method::POST, url)
            .await?
            .json(&json!({ "requests": requests }));
        Self::send(req).await
    }

    async fn load_sheet_ids(&self) -> StoreResult<HashMap<String, i64>> {
        let url = format!(
            "{}/{}?fields=sheets.properties",
            self.base_url, self.spreadsheet_id
        );
        let meta: SpreadsheetMeta =
            serde_json::from_value(Self::send(self.request(Method::GET, url).await?).await?)?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|s| (s.properties.title, s.properties.sheet_id))
            .collect())
    }

    /// Make sure tab `title` exists with `headers` in row 1. Returns the
    /// tab's numeric id. Both facts are cached for the client's lifetime.
    pub async fn ensure_sheet(&self, title: &str, headers: &[&str]) -> StoreResult<i64> {
        let sheet_id = {
            let mut ids = self.sheet_ids.lock().await;
            if !ids.contains_key(title) {
                *ids = self.load_sheet_ids().await?;
            }

            match ids.get(title) {
                Some(id) => *id,
                None => {
                    let reply = self
                        .batch_update(vec![json!({ "addSheet": { "properties": { "title": title } } })])
                        .await?;
                    let id = reply
                        .pointer("/replies/0/addSheet/properties/sheetId")
                        .and_then(Value::as_i64)
                        .ok_or_else(|| StoreError::Http {
                            status: 200,
                            body: format!("addSheet reply without sheetId for {title}"),
                        })?;
                    info!(sheet = title, sheet_id = id, "created sheet");
                    ids.insert(title.to_string(), id);
                    id
                }
            }
        };

        let mut checked = self.headers_checked.lock().await;
        if !checked.contains(title) {
            let header_range = format!("{title}!A1:{}1", column_letter(headers.len()));
            let current = self.get_values(&header_range).await?;
            let wanted: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
            if current.first() != Some(&wanted) {
                self.update_values(&header_range, vec![wanted]).await?;
                debug!(sheet = title, "wrote header row");
            }
            checked.insert(title.to_string());
        }

        Ok(sheet_id)
    }

    pub async fn get_values(&self, range: &str) -> StoreResult<Vec<Vec<String>>> {
        let url = self.values_url(range, "");
        let body = Self::send(self.request(Method::GET, url).await?).await?;
        let range: ValueRange = serde_json::from_value(body)?;
        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    pub async fn update_values(&self, range: &str, rows: Vec<Vec<String>>) -> StoreResult<()> {
        let url = self.values_url(range, "?valueInputOption=RAW");
        let req = self
            .request(Method::PUT, url)
            .await?
            .json(&json!({ "range": range, "values": rows }));
        Self::send(req).await?;
        Ok(())
    }

    pub async fn append_values(&self, range: &str, rows: Vec<Vec<String>>) -> StoreResult<()> {
        let url = self.values_url(range, ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS");
        let req = self
            .request(Method::POST, url)
            .await?
            .json(&json!({ "values": rows }));
        Self::send(req).await?;
        Ok(())
    }

    /// Delete 1-based sheet rows. Requests go out highest row first so
    /// earlier deletions do not shift the later ones.
    pub async fn delete_rows(&self, sheet_id: i64, rows: &[usize]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut ordered = rows.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();

        let requests = ordered
            .into_iter()
            .map(|row| {
                json!({
                    "deleteDimension": {
                        "range": {
                            "sheetId": sheet_id,
                            "dimension": "ROWS",
                            "startIndex": row - 1,
                            "endIndex": row,
                        }
                    }
                })
            })
            .collect();
        self.batch_update(requests).await?;
        Ok(())
    }
}
