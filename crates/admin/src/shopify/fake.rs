//! In-memory Shopify stand-in for unit tests.
//!
//! [`FakeShop`] implements [`GraphQLTransport`] by dispatching on operation
//! names and keeping metafields, tags, lookups and metaobjects in memory. Every
//! call is logged so tests can assert which operations ran.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tagfield_core::{MatchField, ResourceType};

use super::{AdminClient, AdminShopifyError, GraphQLError, GraphQLTransport, Operation, ResourceTypeCatalog};

type MetafieldKey = (String, String, String);

/// Mutable state behind a [`FakeShop`].
#[derive(Default)]
pub struct ShopState {
    /// `(operation name, $value)` -> GID.
    lookups: HashMap<(String, String), String>,
    /// Resource GIDs per type, in insertion order.
    resources: BTreeMap<&'static str, Vec<String>>,
    /// `(owner, namespace, key)` -> `(type, value)`.
    pub metafields: HashMap<MetafieldKey, (String, String)>,
    pub tags: HashMap<String, Vec<String>>,
    pub counts: HashMap<ResourceType, u64>,
    /// `(owner type, namespace, key)` -> validations.
    pub validations: HashMap<(String, String, String), Vec<(String, String)>>,
    /// Definitions per owner type, as returned by `metafieldDefinitions`.
    pub definitions: HashMap<String, Vec<Value>>,
    /// Metaobject definition id -> type.
    pub metaobject_definitions: HashMap<String, String>,
    /// `(type, handle)` -> metaobject GID.
    pub metaobject_handles: HashMap<(String, String), String>,
    pub history_definition: bool,
    /// Stored history metaobjects in creation order: `(id, fields)`.
    pub records: Vec<(String, Vec<(String, String)>)>,
    next_id: u64,
    failures: HashMap<String, String>,
    rejections: HashMap<String, String>,
}

/// Scripted, stateful [`GraphQLTransport`].
#[derive(Default)]
pub struct FakeShop {
    state: Mutex<ShopState>,
    calls: Mutex<Vec<Operation>>,
    catalog: ResourceTypeCatalog,
}

impl FakeShop {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// An [`AdminClient`] backed by this fake.
    #[must_use]
    pub fn client(self: &Arc<Self>) -> AdminClient {
        AdminClient::with_transport(self.clone())
    }

    pub fn state(&self) -> MutexGuard<'_, ShopState> {
        self.state.lock().unwrap()
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Register a resource reachable by `field = raw`. Returns its GID.
    pub fn add_resource(&self, resource_type: ResourceType, field: MatchField, raw: &str, id: u64) -> String {
        let gid = format!("gid://shopify/{}/{id}", resource_type.gid_type());
        let entry = self.catalog.entry(resource_type);
        let mut state = self.state();
        if let Some(lookup) = entry.lookup(field) {
            state
                .lookups
                .insert((lookup.operation.name.to_string(), lookup.filter.build(raw)), gid.clone());
        }
        let ids = state.resources.entry(entry.connection).or_default();
        if !ids.contains(&gid) {
            ids.push(gid.clone());
        }
        gid
    }

    /// Register a resource that exists but has no lookup key.
    pub fn add_owner(&self, resource_type: ResourceType, id: u64) -> String {
        let gid = format!("gid://shopify/{}/{id}", resource_type.gid_type());
        let connection = self.catalog.entry(resource_type).connection;
        let mut state = self.state();
        let ids = state.resources.entry(connection).or_default();
        if !ids.contains(&gid) {
            ids.push(gid.clone());
        }
        gid
    }

    pub fn set_metafield(&self, owner: &str, namespace: &str, key: &str, type_name: &str, value: &str) {
        self.state().metafields.insert(
            (owner.to_string(), namespace.to_string(), key.to_string()),
            (type_name.to_string(), value.to_string()),
        );
    }

    pub fn set_tags(&self, id: &str, tags: &[&str]) {
        self.state()
            .tags
            .insert(id.to_string(), tags.iter().map(|t| (*t).to_string()).collect());
    }

    /// Make an operation fail with a top-level GraphQL error.
    pub fn fail(&self, operation: &str, message: &str) {
        self.state()
            .failures
            .insert(operation.to_string(), message.to_string());
    }

    /// Stop failing an operation.
    pub fn recover(&self, operation: &str) {
        self.state().failures.remove(operation);
    }

    /// Make a mutation answer with a user error.
    pub fn reject(&self, operation: &str, message: &str) {
        self.state()
            .rejections
            .insert(operation.to_string(), message.to_string());
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    #[must_use]
    pub fn metafield(&self, owner: &str, namespace: &str, key: &str) -> Option<String> {
        self.state()
            .metafields
            .get(&(owner.to_string(), namespace.to_string(), key.to_string()))
            .map(|(_, v)| v.clone())
    }

    #[must_use]
    pub fn tags_of(&self, id: &str) -> Vec<String> {
        self.state().tags.get(id).cloned().unwrap_or_default()
    }

    /// Number of calls to an operation.
    #[must_use]
    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|o| o.name == name).count()
    }

    /// Number of mutation calls against store resources (history writes excluded).
    #[must_use]
    pub fn resource_mutations(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.is_mutation() && !o.name.starts_with("History"))
            .count()
    }

    /// Restore field of a stored history record.
    #[must_use]
    pub fn record_field(&self, id: &str, key: &str) -> Option<String> {
        self.state()
            .records
            .iter()
            .find(|(rid, _)| rid == id)
            .and_then(|(_, fields)| fields.iter().find(|(k, _)| k == key))
            .map(|(_, v)| v.clone())
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn owner_exists(state: &ShopState, id: &str) -> bool {
        state.resources.values().any(|ids| ids.iter().any(|g| g == id))
    }

    fn user_errors(state: &ShopState, operation: &str) -> Value {
        state.rejections.get(operation).map_or_else(
            || json!([]),
            |m| json!([{ "field": ["input"], "message": m }]),
        )
    }

    fn dispatch(&self, operation: Operation, vars: &Value) -> Result<Value, AdminShopifyError> {
        let mut state = self.state();
        if let Some(message) = state.failures.get(operation.name) {
            return Err(AdminShopifyError::GraphQL(vec![GraphQLError {
                message: message.clone(),
                locations: vec![],
                path: vec![],
            }]));
        }

        let s = |key: &str| vars.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

        match operation.name {
            "GetMetafield" => {
                let owner = s("ownerId");
                if !Self::owner_exists(&state, &owner) {
                    return Ok(json!({ "node": null }));
                }
                let metafield = state
                    .metafields
                    .get(&(owner.clone(), s("namespace"), s("key")))
                    .map(|(t, v)| {
                        json!({ "id": format!("gid://shopify/Metafield/{}", v.len()), "namespace": s("namespace"), "key": s("key"), "type": t, "value": v })
                    });
                Ok(json!({ "node": { "id": owner, "metafield": metafield } }))
            }
            "MetafieldsSet" => {
                let errors = Self::user_errors(&state, operation.name);
                let mut saved = Vec::new();
                if errors.as_array().is_some_and(Vec::is_empty) {
                    for input in vars["metafields"].as_array().cloned().unwrap_or_default() {
                        let f = |k: &str| input[k].as_str().unwrap_or_default().to_string();
                        state.metafields.insert(
                            (f("ownerId"), f("namespace"), f("key")),
                            (f("type"), f("value")),
                        );
                        saved.push(json!({ "id": "gid://shopify/Metafield/1", "namespace": f("namespace"), "key": f("key"), "type": f("type"), "value": f("value") }));
                    }
                }
                Ok(json!({ "metafieldsSet": { "metafields": saved, "userErrors": errors } }))
            }
            "MetafieldsDelete" => {
                let errors = Self::user_errors(&state, operation.name);
                let mut deleted = Vec::new();
                for input in vars["metafields"].as_array().cloned().unwrap_or_default() {
                    let f = |k: &str| input[k].as_str().unwrap_or_default().to_string();
                    let removed = state.metafields.remove(&(f("ownerId"), f("namespace"), f("key")));
                    deleted.push(removed.map_or(Value::Null, |_| {
                        json!({ "ownerId": f("ownerId"), "namespace": f("namespace"), "key": f("key") })
                    }));
                }
                Ok(json!({ "metafieldsDelete": { "deletedMetafields": deleted, "userErrors": errors } }))
            }
            "MetafieldDefinitions" => {
                let nodes = state.definitions.get(&s("ownerType")).cloned().unwrap_or_default();
                let edges: Vec<Value> = nodes.into_iter().map(|n| json!({ "cursor": "c", "node": n })).collect();
                Ok(json!({ "metafieldDefinitions": { "edges": edges, "pageInfo": { "hasNextPage": false, "endCursor": null } } }))
            }
            "MetafieldDefinitionValidations" => {
                let key = (s("ownerType"), s("namespace"), s("key"));
                Ok(json!({
                    "metafieldDefinition": state.validations.get(&key).map(|v| json!({
                        "id": "gid://shopify/MetafieldDefinition/1",
                        "validations": v.iter().map(|(n, val)| json!({ "name": n, "value": val })).collect::<Vec<_>>(),
                    }))
                }))
            }
            "MetaobjectDefinitionType" => Ok(json!({
                "metaobjectDefinition": state.metaobject_definitions.get(&s("id")).map(|t| json!({ "id": s("id"), "type": t }))
            })),
            "MetaobjectByHandle" => Ok(json!({
                "metaobjectByHandle": state.metaobject_handles.get(&(s("type"), s("handle"))).map(|id| json!({ "id": id }))
            })),
            "GetTags" => {
                let id = s("id");
                if !Self::owner_exists(&state, &id) {
                    return Ok(json!({ "node": null }));
                }
                Ok(json!({ "node": { "id": id, "tags": state.tags.get(&id).cloned().unwrap_or_default() } }))
            }
            "TagsAdd" | "TagsRemove" => {
                let errors = Self::user_errors(&state, operation.name);
                let id = s("id");
                let requested: Vec<String> = serde_json::from_value(vars["tags"].clone()).unwrap_or_default();
                if errors.as_array().is_some_and(Vec::is_empty) {
                    let tags = state.tags.entry(id.clone()).or_default();
                    for tag in requested {
                        let present = tags.iter().any(|t| t.eq_ignore_ascii_case(&tag));
                        if operation.name == "TagsAdd" && !present {
                            tags.push(tag);
                        } else if operation.name == "TagsRemove" {
                            tags.retain(|t| !t.eq_ignore_ascii_case(&tag));
                        }
                    }
                }
                let key = if operation.name == "TagsAdd" { "tagsAdd" } else { "tagsRemove" };
                Ok(json!({ key: { "node": { "id": id }, "userErrors": errors } }))
            }
            "ShopIdentity" => Ok(json!({ "shop": { "email": "owner@tagfield.test", "myshopifyDomain": "tagfield-dev.myshopify.com" } })),
            "HistoryDefinition" => Ok(json!({
                "metaobjectDefinitionByType": state.history_definition.then(|| json!({ "id": "gid://shopify/MetaobjectDefinition/77", "type": s("type") }))
            })),
            "HistoryDefinitionCreate" => {
                state.history_definition = true;
                Ok(json!({ "metaobjectDefinitionCreate": {
                    "metaobjectDefinition": { "id": "gid://shopify/MetaobjectDefinition/77", "type": vars["definition"]["type"] },
                    "userErrors": []
                } }))
            }
            "HistoryCreate" => {
                state.next_id += 1;
                let id = format!("gid://shopify/Metaobject/{}", 1000 + state.next_id);
                let fields: Vec<(String, String)> = vars["metaobject"]["fields"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .iter()
                    .map(|f| (f["key"].as_str().unwrap_or_default().to_string(), f["value"].as_str().unwrap_or_default().to_string()))
                    .collect();
                state.records.push((id.clone(), fields.clone()));
                Ok(json!({ "metaobjectCreate": { "metaobject": metaobject_json(&id, &fields), "userErrors": [] } }))
            }
            "HistoryPage" => Ok(history_page(&state, vars)),
            "HistoryRecord" => {
                let id = s("id");
                Ok(json!({ "metaobject": state.records.iter().find(|(rid, _)| *rid == id).map(|(rid, f)| metaobject_json(rid, f)) }))
            }
            "HistoryUpdate" => {
                let id = s("id");
                let updates = vars["metaobject"]["fields"].as_array().cloned().unwrap_or_default();
                if let Some((_, fields)) = state.records.iter_mut().find(|(rid, _)| *rid == id) {
                    for u in updates {
                        let key = u["key"].as_str().unwrap_or_default().to_string();
                        let value = u["value"].as_str().unwrap_or_default().to_string();
                        match fields.iter_mut().find(|(k, _)| *k == key) {
                            Some(slot) => slot.1 = value,
                            None => fields.push((key, value)),
                        }
                    }
                }
                Ok(json!({ "metaobjectUpdate": { "metaobject": { "id": id }, "userErrors": [] } }))
            }
            "HistoryDelete" => {
                let id = s("id");
                state.records.retain(|(rid, _)| *rid != id);
                Ok(json!({ "metaobjectDelete": { "deletedId": id, "userErrors": [] } }))
            }
            "ExportMetaobjects" => Ok(json!({ "metaobjects": { "edges": [], "pageInfo": { "hasNextPage": false } } })),
            name => self.dispatch_catalog(&state, name, vars),
        }
    }

    fn dispatch_catalog(&self, state: &ShopState, name: &str, vars: &Value) -> Result<Value, AdminShopifyError> {
        for resource_type in ResourceType::ALL {
            let entry = self.catalog.entry(resource_type);

            if let Some(lookup) = entry.lookups.iter().find(|l| l.operation.name == name) {
                let value = vars["value"].as_str().unwrap_or_default().to_string();
                let found = state.lookups.get(&(name.to_string(), value));
                return Ok(found.map_or_else(|| json!({}), |gid| nest(lookup.id_pointer, json!(gid))));
            }
            if entry.count.name == name {
                return state.counts.get(&resource_type).map_or_else(
                    || Err(AdminShopifyError::missing("count")),
                    |c| Ok(nest(entry.count_pointer, json!(c))),
                );
            }

            let ids = state.resources.get(entry.connection).cloned().unwrap_or_default();
            let first = vars["first"].as_u64().unwrap_or(50);
            let after = vars["after"].as_str();

            if entry.scan_ids.name == name {
                return Ok(connection(entry.connection, &ids, first, after, |id| json!({ "id": id })));
            }
            if entry.scan_tags.is_some_and(|o| o.name == name) {
                return Ok(connection(entry.connection, &ids, first, after, |id| {
                    json!({ "id": id, "tags": state.tags.get(id).cloned().unwrap_or_default() })
                }));
            }
            if entry.export.name == name {
                return Ok(connection(entry.connection, &ids, first, after, |id| {
                    let metafields: Vec<Value> = state
                        .metafields
                        .iter()
                        .filter(|((owner, _, _), _)| owner == id)
                        .map(|((_, ns, key), (_, value))| json!({ "node": { "namespace": ns, "key": key, "value": value } }))
                        .collect();
                    json!({
                        "id": id,
                        "title": format!("Title {id}"),
                        "handle": id.rsplit('/').next().unwrap_or_default(),
                        "tags": state.tags.get(id).cloned().unwrap_or_default(),
                        "metafields": { "edges": metafields },
                    })
                }));
            }
        }
        Err(AdminShopifyError::missing(name))
    }
}

#[async_trait]
impl GraphQLTransport for FakeShop {
    async fn execute(&self, operation: Operation, variables: Value) -> Result<Value, AdminShopifyError> {
        self.calls.lock().unwrap().push(operation);
        self.dispatch(operation, &variables)
    }
}

/// Build `{"a": {"b": [{"c": leaf}]}}` from `/a/b/0/c`.
fn nest(pointer: &str, leaf: Value) -> Value {
    pointer
        .trim_start_matches('/')
        .split('/')
        .rev()
        .fold(leaf, |inner, segment| {
            if segment.parse::<usize>().is_ok() {
                Value::Array(vec![inner])
            } else {
                let mut map = Map::new();
                map.insert(segment.to_string(), inner);
                Value::Object(map)
            }
        })
}

fn connection(
    field: &str,
    ids: &[String],
    first: u64,
    after: Option<&str>,
    node: impl Fn(&String) -> Value,
) -> Value {
    let start = after.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
    let end = (start + usize::try_from(first).unwrap()).min(ids.len());
    let edges: Vec<Value> = ids
        .get(start..end)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, id)| json!({ "cursor": (start + i + 1).to_string(), "node": node(id) }))
        .collect();
    let mut map = Map::new();
    map.insert(
        field.to_string(),
        json!({
            "edges": edges,
            "pageInfo": { "hasNextPage": end < ids.len(), "endCursor": end.to_string() }
        }),
    );
    Value::Object(map)
}

fn metaobject_json(id: &str, fields: &[(String, String)]) -> Value {
    json!({
        "id": id,
        "handle": id.rsplit('/').next().unwrap_or_default(),
        "fields": fields.iter().map(|(k, v)| json!({ "key": k, "value": v })).collect::<Vec<_>>(),
    })
}

fn history_page(state: &ShopState, vars: &Value) -> Value {
    let mut ordered: Vec<&(String, Vec<(String, String)>)> = state.records.iter().collect();
    if vars["reverse"].as_bool().unwrap_or(false) {
        ordered.reverse();
    }
    let position = |cursor: &str| ordered.iter().position(|(id, _)| id == cursor);

    let (start, end) = if let Some(last) = vars["last"].as_u64() {
        let end = vars["before"].as_str().and_then(position).unwrap_or(ordered.len());
        (end.saturating_sub(usize::try_from(last).unwrap()), end)
    } else {
        let first = usize::try_from(vars["first"].as_u64().unwrap_or(10)).unwrap();
        let start = vars["after"].as_str().and_then(position).map_or(0, |p| p + 1);
        (start, (start + first).min(ordered.len()))
    };

    let window = ordered.get(start..end).unwrap_or_default();
    json!({
        "metaobjects": {
            "nodes": window.iter().map(|(id, f)| metaobject_json(id, f)).collect::<Vec<_>>(),
            "pageInfo": {
                "hasNextPage": end < ordered.len(),
                "hasPreviousPage": start > 0,
                "startCursor": window.first().map(|(id, _)| id.clone()),
                "endCursor": window.last().map(|(id, _)| id.clone()),
            }
        }
    })
}
