use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::KvBackend;
use crate::error::{StoreError, StoreResult};

/// Upstash / Vercel KV compatible REST backend.
///
/// Values are stored as JSON text: `POST {url}/set/{key}` with the text as
/// body, `GET {url}/get/{key}` returning `{"result": "<text>" | null}`.
pub struct RestKv {
    http: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl RestKv {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, token)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, command: &str, key: &str) -> String {
        format!("{}/{command}/{}", self.base_url, urlencoding::encode(key))
    }

    async fn reply(res: reqwest::Response) -> StoreResult<RestReply> {
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let reply: RestReply = serde_json::from_str(&body)?;
        if let Some(error) = reply.error {
            return Err(StoreError::Http {
                status: status.as_u16(),
                body: error,
            });
        }
        Ok(reply)
    }
}

/// The REST API hands back stored text; older writers stored raw JSON.
fn decode_result(result: Value) -> StoreResult<Option<Value>> {
    match result {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(serde_json::from_str(&text)?)),
        other => Ok(Some(other)),
    }
}

#[async_trait]
impl KvBackend for RestKv {
    fn name(&self) -> &'static str {
        "rest-kv"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let res = self
            .http
            .get(self.url("get", key))
            .bearer_auth(&self.token)
            .send()
            .await?;
        decode_result(Self::reply(res).await?.result)
    }

    async fn set(&self, key: &str, value: &Value) -> StoreResult<()> {
        let res = self
            .http
            .post(self.url("set", key))
            .bearer_auth(&self.token)
            .body(serde_json::to_string(value)?)
            .send()
            .await?;
        Self::reply(res).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_path_encoded() {
        let kv = RestKv::new("https://kv.example.com/", "t");
        assert_eq!(kv.url("get", "biyo:visits"), "https://kv.example.com/get/biyo%3Avisits");
    }

    #[test]
    fn results_decode_from_text_or_json() {
        assert_eq!(decode_result(Value::Null).unwrap(), None);
        assert_eq!(
            decode_result(json!("[{\"id\":\"p1\"}]")).unwrap(),
            Some(json!([{"id": "p1"}]))
        );
        assert_eq!(decode_result(json!([1, 2])).unwrap(), Some(json!([1, 2])));
        assert!(decode_result(json!("not json")).is_err());
    }
}
