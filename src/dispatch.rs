//! `/v3/send` action dispatch.
//!
//! A Pocket client sends a mixed batch of actions. The batch is split into
//! in-place modifications, additions and deletions; each group's calls run
//! concurrently and the groups run alongside each other. Within a group the
//! first failure drops the calls still in flight, and any group failure fails
//! the whole batch. There is no per-item result reporting.

use futures::future::try_join_all;
use serde::Deserialize;

use crate::backend::{PocketBackend, Verb};
use crate::error::{BackendError, BackendResult};

/// Pocket sends ids both as strings and as bare numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Text(String),
    Number(i64),
}

impl ItemId {
    fn into_string(self) -> String {
        match self {
            ItemId::Text(id) => id,
            ItemId::Number(id) => id.to_string(),
        }
    }
}

/// One element of the `actions` array, as received.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawAction {
    pub action: String,
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Modify { item_id: String, verb: Verb },
    Add { url: String },
    Delete { item_id: String },
}

fn required_id(raw: &RawAction) -> BackendResult<String> {
    raw.item_id
        .clone()
        .map(ItemId::into_string)
        .ok_or_else(|| BackendError::InvalidId(String::new()))
}

/// Decide what a raw action asks for.
pub fn classify(raw: &RawAction) -> BackendResult<Action> {
    match raw.action.as_str() {
        "add" => raw
            .url
            .clone()
            .map(|url| Action::Add { url })
            .ok_or_else(|| BackendError::InvalidUrl {
                url: String::new(),
                reason: "add action without url".to_string(),
            }),
        "delete" => Ok(Action::Delete {
            item_id: required_id(raw)?,
        }),
        verb => {
            let verb = verb.parse::<Verb>()?;
            Ok(Action::Modify {
                item_id: required_id(raw)?,
                verb,
            })
        }
    }
}

/// A batch split by the backend operation each action needs.
#[derive(Debug, Default)]
pub struct Batch {
    pub modify: Vec<(String, Verb)>,
    pub add: Vec<String>,
    pub delete: Vec<String>,
    pub rejected: Vec<BackendError>,
}

pub fn partition(actions: &[RawAction]) -> Batch {
    let mut batch = Batch::default();
    for raw in actions {
        match classify(raw) {
            Ok(Action::Modify { item_id, verb }) => batch.modify.push((item_id, verb)),
            Ok(Action::Add { url }) => batch.add.push(url),
            Ok(Action::Delete { item_id }) => batch.delete.push(item_id),
            Err(err) => {
                tracing::warn!(action = %raw.action, error = %err, "rejecting action");
                batch.rejected.push(err);
            }
        }
    }
    batch
}

/// Run a batch against `backend`.
pub async fn dispatch(backend: &dyn PocketBackend, actions: &[RawAction]) -> BackendResult<()> {
    let batch = partition(actions);
    tracing::info!(
        backend = backend.name(),
        modify = batch.modify.len(),
        add = batch.add.len(),
        delete = batch.delete.len(),
        rejected = batch.rejected.len(),
        "dispatching actions"
    );

    let modify = try_join_all(
        batch
            .modify
            .iter()
            .map(|(item_id, verb)| backend.modify(item_id, *verb)),
    );
    let add = try_join_all(batch.add.iter().map(|url| backend.add(url)));
    let delete = try_join_all(batch.delete.iter().map(|item_id| backend.delete(item_id)));

    let (modify, add, delete) = futures::join!(modify, add, delete);
    modify?;
    add?;
    delete?;

    match batch.rejected.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
