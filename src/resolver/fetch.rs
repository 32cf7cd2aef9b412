//! Association fetching: one batched backend call per association.

use super::AssociationResolver;
use super::extract::{ExtractedProps, build_params, extract_props};
use crate::core::{Object, OwnerDialect, ResolveError, Result};
use crate::metadata::{AssociationDescriptor, Dialect, MetadataCapability, ResourceMetadata};
use crate::network::CallOptions;
use futures::future::try_join_all;
use serde_json::{Value, json};
use std::sync::Arc;

/// Objects fetched for one association, with what is needed to assign them.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    /// Association name
    pub name: String,
    /// To-many association
    pub many: bool,
    /// Props the request was built from
    pub extracted: ExtractedProps,
    /// Fetched objects, in response order
    pub objects: Vec<Object>,
}

/// The backend operation chosen for an association and how to call it.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    /// Operation name on the target type
    pub operation: &'static str,
    /// Call options
    pub options: CallOptions,
}

/// Merge `source` into `target`; arrays are concatenated, objects merged.
fn merge_concat(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(existing) => merge_concat(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => target.extend(source.iter().cloned()),
        (Value::Array(target), source) => target.push(source.clone()),
        (target, source) => *target = source.clone(),
    }
}

/// Search request body filtering on `ids`, merged with a configured default search.
#[must_use]
pub fn search_body(ids: &[String], default_search: Option<&Value>) -> Value {
    let mut body = json!({"search": {"filters": [["id", "in", ids]]}});
    if let Some(default_search) = default_search {
        merge_concat(&mut body, default_search);
    }
    body
}

/// Choose the operation used to fetch an association.
///
/// In order of preference:
/// 1. `search` with an `id in [...]` filter, when references only carry ids
/// 2. linked owners: `query` for to-many, `get` for to-one and HABTM references
/// 3. schema owners: the first of `search`, `get`, `query` whose simple template
///    variables can all be filled from the extracted props
pub fn select_strategy(
    name: &str,
    owner_dialect: Dialect,
    target: &ResourceMetadata,
    many: bool,
    extracted: &ExtractedProps,
    default_search: Option<&Value>,
) -> Result<Strategy> {
    if extracted.referenced_by_id() {
        if let Some(search) = target.find_operation("search") {
            let ids = extracted.all.get("id").map(Vec::as_slice).unwrap_or_default();
            return Ok(Strategy {
                operation: "search",
                options: CallOptions::with_params(build_params(search, &extracted.all))
                    .body(search_body(ids, default_search)),
            });
        }
    }

    let unresolvable = || ResolveError::UnresolvableAssociationAction {
        name: name.to_string(),
    };

    match owner_dialect {
        Dialect::Linked => {
            let operation = if many && !extracted.habtm { "query" } else { "get" };
            let found = target.find_operation(operation).ok_or_else(unresolvable)?;
            Ok(Strategy {
                operation,
                options: CallOptions::with_params(build_params(found, &extracted.all)),
            })
        }
        Dialect::Schema => ["search", "get", "query"]
            .into_iter()
            .find_map(|operation| {
                let found = target.find_operation(operation)?;
                let params = build_params(found, &extracted.all);
                let template = found.uri_template().ok()?;
                template
                    .required_variables()
                    .iter()
                    .all(|variable| params.contains_key(*variable))
                    .then(|| Strategy {
                        operation,
                        options: CallOptions::with_params(params),
                    })
            })
            .ok_or_else(unresolvable),
    }
}

impl AssociationResolver {
    /// Metadata of every distinct owner type, in owner order.
    async fn owner_metadata(&self, owners: &[Object]) -> Result<Vec<Arc<ResourceMetadata>>> {
        let mut ids: Vec<&str> = Vec::new();
        for owner in owners {
            if let Some(id) = OwnerDialect::of(owner).metadata_id_of(owner) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }

        let lookups = ids.into_iter().map(|id| self.signal.run(self.metadata.metadata(id)));
        try_join_all(lookups).await
    }

    /// Fetch association `name` for all `owners` with a single backend call.
    ///
    /// The first owner type declaring the association decides its descriptor,
    /// so owners of a subclass may expose associations their base type lacks.
    pub async fn fetch_association(&self, owners: &[Object], name: &str) -> Result<FetchResult> {
        let owner_metadata = self.owner_metadata(owners).await?;
        let (declaring, descriptor): (&ResourceMetadata, &AssociationDescriptor) = owner_metadata
            .iter()
            .find_map(|metadata| metadata.associations().get(name).map(|d| (&**metadata, d)))
            .ok_or_else(|| ResolveError::AssociationNotFound {
                name: name.to_string(),
            })?;

        let target = self.signal.run(self.metadata.metadata(&descriptor.target)).await?;
        let extracted = extract_props(name, &*target, owners);
        let many = descriptor.many;

        let strategy = select_strategy(
            name,
            declaring.dialect(),
            &target,
            many,
            &extracted,
            self.config.default_associations_search.get(name),
        )?;

        tracing::debug!(
            target: "resolver",
            "Fetching '{}' via {}.{} (props: {:?})",
            name,
            descriptor.target,
            strategy.operation,
            extracted.all.keys().collect::<Vec<_>>()
        );

        self.signal.check()?;
        let result = self
            .signal
            .run(self.network.invoke(&descriptor.target, strategy.operation, strategy.options))
            .await?;

        Ok(FetchResult {
            name: name.to_string(),
            many,
            extracted,
            objects: result.objects,
        })
    }
}
