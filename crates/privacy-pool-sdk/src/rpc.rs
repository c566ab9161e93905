//! [`PoolChain`] over a Sui full node's JSON-RPC API.

use async_trait::async_trait;
use pool_transport::{Config, JsonRpcClient};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::chain::{EventCursor, EventPage, OnChainTreeState, PoolChain};
use crate::crypto::parse_field_element;
use crate::error::{Result, SdkError};
use crate::events::{json_u64, ChainEvent, EventKind};

pub const TREE_FIELD: &str = "marklet_tree_with_history";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryEventsResult {
    #[serde(default)]
    data: Vec<RawEvent>,
    #[serde(default)]
    next_cursor: Option<EventCursor>,
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    parsed_json: Value,
}

pub struct SuiRpcChain {
    rpc: JsonRpcClient,
    package_id: String,
    config_id: String,
}

impl SuiRpcChain {
    pub fn new(rpc: JsonRpcClient, package_id: impl Into<String>, config_id: impl Into<String>) -> Self {
        Self {
            rpc,
            package_id: package_id.into(),
            config_id: config_id.into(),
        }
    }

    pub fn connect(
        endpoint: &str,
        config: Config,
        package_id: impl Into<String>,
        config_id: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::new(JsonRpcClient::new(endpoint, config)?, package_id, config_id))
    }

    pub fn package_id(&self) -> &str {
        &self.package_id
    }
}

#[async_trait]
impl PoolChain for SuiRpcChain {
    async fn query_events(
        &self,
        kind: EventKind,
        cursor: Option<EventCursor>,
        limit: usize,
    ) -> Result<EventPage> {
        let params = json!([
            { "MoveEventType": kind.move_type(&self.package_id) },
            cursor,
            limit,
            false
        ]);
        let result: QueryEventsResult = self.rpc.call("suix_queryEvents", params).await?;
        debug!(?kind, count = result.data.len(), has_next = result.has_next_page, "suix_queryEvents");

        let events = result
            .data
            .iter()
            .map(|raw| ChainEvent::from_raw(&raw.type_name, &raw.parsed_json))
            .collect::<Result<Vec<_>>>()?;

        Ok(EventPage {
            events,
            next_cursor: result.next_cursor,
            has_next_page: result.has_next_page,
        })
    }

    async fn pool_tree_state(&self) -> Result<OnChainTreeState> {
        let object: Value = self
            .rpc
            .call(
                "sui_getObject",
                json!([self.config_id, { "showContent": true }]),
            )
            .await?;
        parse_tree_state(&object)
    }
}

/// Extract `content.fields.marklet_tree_with_history.fields` from a
/// `sui_getObject` response (with or without the outer `data` envelope).
pub fn parse_tree_state(object: &Value) -> Result<OnChainTreeState> {
    let root = object.get("data").unwrap_or(object);
    let tree = root
        .pointer(&format!("/content/fields/{}/fields", TREE_FIELD))
        .ok_or_else(|| {
            SdkError::ChainState(format!("pool config object has no {} fields", TREE_FIELD))
        })?;

    let number = |name: &str| -> Result<u64> {
        let value = tree
            .get(name)
            .ok_or_else(|| SdkError::ChainState(format!("tree state is missing '{}'", name)))?;
        json_u64(value, name).map_err(|e| SdkError::ChainState(e.to_string()))
    };
    let next_index = number("next_index")?;
    let current_root_index = number("current_root_index")?;

    let roots = tree
        .get("roots")
        .and_then(Value::as_array)
        .ok_or_else(|| SdkError::ChainState("tree state has no roots array".into()))?
        .iter()
        .map(|value| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => return Err(SdkError::ChainState(format!("invalid root {}", other))),
            };
            parse_field_element(&text).map_err(|e| SdkError::ChainState(e.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(OnChainTreeState {
        next_index,
        current_root_index,
        roots,
    })
}
