use crate::{
    constants::{NOTHING_TO_MINE, REQUIRED_TX_FIELDS},
    ApiError, AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ledger_core::{now_secs, validate::find_invalid_block, Block, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;

#[derive(Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChainResponse {
    pub length: usize,
    pub chain: Vec<Block>,
}

#[derive(Serialize, Deserialize)]
pub struct ValidityResponse {
    pub valid: bool,
    pub length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/new_transaction", post(new_transaction))
        .route("/chain", get(get_chain))
        .route("/mine", get(mine))
        .route("/pending_tx", get(pending_tx).post(pending_tx))
        .route("/validate", get(validate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

async fn new_transaction(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let tx = stamp_transaction(payload)?;
    state.submit_transaction(tx);
    Ok((StatusCode::CREATED, "Success"))
}

/// Reject payloads missing a required field and record when the node received them.
fn stamp_transaction(payload: Value) -> Result<Transaction, ApiError> {
    let Value::Object(mut fields) = payload else {
        return Err(ApiError::InvalidTransaction);
    };
    let complete = REQUIRED_TX_FIELDS
        .iter()
        .all(|name| fields.get(*name).is_some_and(is_present));
    if !complete {
        return Err(ApiError::InvalidTransaction);
    }
    fields.insert("timestamp".to_string(), Value::from(now_secs()));
    Ok(Value::Object(fields))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

async fn get_chain(State(state): State<AppState>) -> Json<ChainResponse> {
    let chain = state.ledger().chain().to_vec();
    Json(ChainResponse {
        length: chain.len(),
        chain,
    })
}

async fn mine(State(state): State<AppState>) -> Result<String, ApiError> {
    Ok(match state.mine_pending().await? {
        Some(index) => format!("Block #{index} is mined."),
        None => NOTHING_TO_MINE.to_string(),
    })
}

async fn pending_tx(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.ledger().unconfirmed_transactions().to_vec())
}

async fn validate(State(state): State<AppState>) -> Json<ValidityResponse> {
    let (length, fault) = {
        let ledger = state.ledger();
        (
            ledger.len(),
            find_invalid_block(ledger.chain(), ledger.difficulty()),
        )
    };
    Json(ValidityResponse {
        valid: fault.is_none(),
        length,
        invalid_index: fault.map(|(index, _)| index),
        reason: fault.map(|(_, fault)| fault.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stamps_complete_transactions() {
        let tx = stamp_transaction(json!({"author": "ana", "content": "hello"})).unwrap();
        assert_eq!(tx["author"], "ana");
        assert_eq!(tx["content"], "hello");
        assert!(tx["timestamp"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn rejects_missing_or_empty_fields() {
        for payload in [
            json!({"author": "ana"}),
            json!({"content": "hello"}),
            json!({"author": "", "content": "hello"}),
            json!({"author": "ana", "content": null}),
            json!(["author", "content"]),
            json!("ana: hello"),
        ] {
            assert!(matches!(
                stamp_transaction(payload),
                Err(ApiError::InvalidTransaction)
            ));
        }
    }

    #[test]
    fn keeps_extra_fields() {
        let tx = stamp_transaction(json!({"author": "ana", "content": "x", "tags": ["a"]})).unwrap();
        assert_eq!(tx["tags"], json!(["a"]));
    }
}
