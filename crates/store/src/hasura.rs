//! Hasura GraphQL mission store
//!
//! Issues the `missions` query, `update_missions` mutation and an
//! `insert_missions` upsert with an `on_conflict` clause against a Hasura
//! endpoint. Request timeouts are enforced by the underlying `reqwest`
//! client so a hung store surfaces as [`StoreError::Transport`].

use crate::{MissionFilter, MissionPatch, MissionSelector, MissionStore, StoreError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use stakeline_core::{Mission, StoreConfig};
use tracing::{debug, warn};

const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

const MISSION_FIELDS: &str = "id status type wallet mints reward started_at extract_at transactions";

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SelectData {
    missions: Vec<Mission>,
}

#[derive(Debug, Deserialize)]
struct Returning {
    returning: Vec<Mission>,
}

#[derive(Debug, Deserialize)]
struct UpdateData {
    update_missions: Returning,
}

#[derive(Debug, Deserialize)]
struct InsertData {
    insert_missions: Returning,
}

/// [`MissionStore`] backed by a Hasura GraphQL endpoint
#[derive(Debug, Clone)]
pub struct HasuraMissionStore {
    http: reqwest::Client,
    endpoint: String,
    admin_secret: Option<String>,
    upsert_constraint: String,
}

impl HasuraMissionStore {
    /// Build a store client from configuration
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            admin_secret: config.admin_secret.clone(),
            upsert_constraint: config.upsert_constraint.clone(),
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, StoreError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(secret) = &self.admin_secret {
            request = request.header(ADMIN_SECRET_HEADER, secret);
        }

        let response = request.send().await?.error_for_status()?;
        let body: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("{}: {}", operation, e)))?;

        if !body.errors.is_empty() {
            let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
            warn!(operation, errors = ?messages, "Store rejected request");
            return Err(StoreError::Rejected(messages.join("; ")));
        }

        body.data
            .ok_or_else(|| StoreError::Decode(format!("{}: response has no data", operation)))
    }

    fn upsert_document(&self) -> String {
        format!(
            "mutation upsertMissions($objects: [missions_insert_input!]!) {{
                insert_missions(objects: $objects, on_conflict: {{
                    constraint: {},
                    update_columns: [status, transactions, reward]
                }}) {{
                    returning {{ {} }}
                }}
            }}",
            self.upsert_constraint, MISSION_FIELDS
        )
    }
}

/// Hasura `missions_bool_exp` for a filter
pub(crate) fn filter_expression(filter: &MissionFilter) -> Value {
    let mut clauses = vec![json!({ "status": { "_eq": filter.status.as_str() } })];
    if let Some(instant) = filter.extract_before {
        clauses.push(json!({ "extract_at": { "_lt": instant.to_rfc3339() } }));
    }
    json!({ "_and": clauses })
}

/// Hasura `missions_bool_exp` for a selector
pub(crate) fn selector_expression(selector: &MissionSelector) -> Value {
    match selector {
        MissionSelector::Ids(ids) => json!({ "id": { "_in": ids } }),
        MissionSelector::Filter(filter) => filter_expression(filter),
    }
}

/// Row representation sent to `insert_missions`
pub(crate) fn insert_object(mission: &Mission) -> Result<Value, StoreError> {
    serde_json::to_value(mission).map_err(|e| StoreError::Decode(e.to_string()))
}

#[async_trait]
impl MissionStore for HasuraMissionStore {
    async fn select_missions(&self, filter: &MissionFilter) -> Result<Vec<Mission>, StoreError> {
        let query = format!(
            "query selectMissions($where: missions_bool_exp!) {{
                missions(where: $where) {{ {} }}
            }}",
            MISSION_FIELDS
        );

        let data: SelectData = self
            .execute("selectMissions", &query, json!({ "where": filter_expression(filter) }))
            .await?;

        debug!(status = %filter.status, rows = data.missions.len(), "Selected missions");
        Ok(data.missions)
    }

    async fn update_missions(
        &self,
        selector: &MissionSelector,
        patch: &MissionPatch,
    ) -> Result<Vec<Mission>, StoreError> {
        let query = format!(
            "mutation updateMissions($where: missions_bool_exp!, $_set: missions_set_input) {{
                update_missions(where: $where, _set: $_set) {{
                    returning {{ {} }}
                }}
            }}",
            MISSION_FIELDS
        );

        let set = serde_json::to_value(patch).map_err(|e| StoreError::Decode(e.to_string()))?;
        let data: UpdateData = self
            .execute(
                "updateMissions",
                &query,
                json!({ "where": selector_expression(selector), "_set": set }),
            )
            .await?;

        Ok(data.update_missions.returning)
    }

    async fn upsert_missions(&self, missions: &[Mission]) -> Result<Vec<Mission>, StoreError> {
        let objects = missions
            .iter()
            .map(insert_object)
            .collect::<Result<Vec<_>, _>>()?;

        let data: InsertData = self
            .execute(
                "upsertMissions",
                &self.upsert_document(),
                json!({ "objects": objects }),
            )
            .await?;

        Ok(data.insert_missions.returning)
    }
}
