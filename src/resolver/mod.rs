//! Association graph resolution.
//!
//! The resolver turns flat owner objects carrying references into a graph
//! shaped by a [`Selection`]. For every selected association it performs one
//! batched backend call, recurses into the association's own selection and
//! writes the results back onto the owners.
//!
//! # Resolution Process
//!
//! 1. **Base cases**: no owners, or the wildcard selection, return the owners
//!    unchanged.
//! 2. **Identity**: identity and bookkeeping keys are added to the selection so
//!    they survive trimming.
//! 3. **Candidates**: associations that are both selected and referenced by at
//!    least one owner. A selected association without a nested selection is
//!    resolved with the wildcard.
//! 4. **Branches**: every candidate is resolved concurrently:
//!    - fetch ([`AssociationResolver::fetch_association`]), one call for all owners
//!    - derive a selection extended with the props the assignment matches on
//!    - resolve the fetched objects recursively with that selection
//! 5. **Assignment**: results are assigned with [`assign`]; a failed branch
//!    leaves `null` on every owner ([`assign_empty`]).
//! 6. **Trimming**: owners are reduced to the selected keys.
//!
//! # Failures
//!
//! A failure inside one branch (unknown association, no usable operation,
//! network error) is logged and only nulls that association. Cancellation is
//! the exception: it aborts the whole resolution.
//!
//! # Concurrency
//!
//! Branches only read the owners; all writes happen after every branch has
//! settled, so no two branches ever touch the same object. The
//! [`CancellationSignal`] is checked before every backend call and every
//! recursive descent, and in-flight calls are raced against it.

pub mod assign;
pub mod extract;
pub mod fetch;


use crate::config::ClientConfig;
use crate::core::{CancellationSignal, Object, OwnerDialect, Result};
use crate::metadata::MetadataProvider;
use crate::network::NetworkClient;
use crate::selection::{Field, Selection};
use futures::future::{BoxFuture, FutureExt, try_join_all};
use std::collections::BTreeSet;
use std::sync::Arc;

pub use assign::{assign, assign_empty, assign_to_linked, assign_to_schema};
pub use extract::{ExtractedProps, Props, build_params, extract_props, extract_references, get_props};
pub use fetch::{FetchResult, Strategy, select_strategy};

/// How one association branch ended.
enum Outcome {
    Resolved(FetchResult),
    Failed(String),
}

/// Resolves selected associations of owner objects.
#[derive(Clone)]
pub struct AssociationResolver {
    metadata: Arc<dyn MetadataProvider>,
    network: Arc<dyn NetworkClient>,
    config: Arc<ClientConfig>,
    signal: CancellationSignal,
}

impl AssociationResolver {
    /// Create a resolver with a fresh cancellation signal.
    #[must_use]
    pub fn new(
        metadata: Arc<dyn MetadataProvider>,
        network: Arc<dyn NetworkClient>,
        config: Arc<ClientConfig>,
    ) -> Self {
        Self {
            metadata,
            network,
            config,
            signal: CancellationSignal::new(),
        }
    }

    /// Observe `signal` instead of the resolver's own.
    #[must_use]
    pub fn with_signal(mut self, signal: CancellationSignal) -> Self {
        self.signal = signal;
        self
    }

    /// The signal this resolver observes.
    #[must_use]
    pub const fn signal(&self) -> &CancellationSignal {
        &self.signal
    }

    /// Resolve the associations `selection` asks for and trim `owners` to it.
    pub fn resolve<'a>(&'a self, owners: Vec<Object>, selection: &'a Selection) -> BoxFuture<'a, Result<Vec<Object>>> {
        async move {
            self.signal.check()?;
            if owners.is_empty() || selection.is_wildcard() {
                return Ok(owners);
            }

            let selection = selection.with_identity();
            let candidates = candidates(&owners, &selection);

            let branches = candidates.iter().map(|(name, nested)| self.resolve_branch(&owners, name, nested));
            let outcomes = try_join_all(branches).await?;

            let mut owners = owners;
            for outcome in outcomes {
                match outcome {
                    Outcome::Resolved(fetched) => {
                        assign(&mut owners, &fetched.objects, &fetched.name, fetched.many, &fetched.extracted);
                    }
                    Outcome::Failed(name) => assign_empty(&mut owners, &name),
                }
            }

            Ok(owners.into_iter().map(|owner| selection.trim(owner)).collect())
        }
        .boxed()
    }

    /// Run one association branch. Only cancellation is returned as an error.
    async fn resolve_branch(&self, owners: &[Object], name: &str, nested: &Selection) -> Result<Outcome> {
        match self.resolve_association(owners, name, nested).await {
            Ok(fetched) => Ok(Outcome::Resolved(fetched)),
            Err(e) if e.is_cancellation() => Err(e),
            Err(e) => {
                tracing::warn!(target: "resolver", "Failed to resolve association '{}': {}", name, e);
                if self.config.verbose {
                    tracing::debug!(target: "resolver", "Selection for '{}': {:?}", name, nested);
                }
                Ok(Outcome::Failed(name.to_string()))
            }
        }
    }

    /// Fetch association `name` and resolve the fetched objects with `nested`.
    async fn resolve_association(&self, owners: &[Object], name: &str, nested: &Selection) -> Result<FetchResult> {
        let mut fetched = self.fetch_association(owners, name).await?;

        let extended = nested.extended_with(fetched.extracted.all.keys());
        self.signal.check()?;
        fetched.objects = self.resolve(std::mem::take(&mut fetched.objects), &extended).await?;

        Ok(fetched)
    }
}

/// Selected associations referenced by at least one owner, with their nested selection.
fn candidates(owners: &[Object], selection: &Selection) -> Vec<(String, Selection)> {
    let referenced: BTreeSet<String> =
        owners.iter().flat_map(|owner| OwnerDialect::of(owner).reference_names(owner)).collect();

    selection
        .keys()
        .filter(|key| referenced.contains(*key))
        .map(|key| {
            let nested = match selection.get(key) {
                Some(Field::Nested(nested)) => nested.clone(),
                _ => Selection::Wildcard,
            };
            (key.to_string(), nested)
        })
        .collect()
}
