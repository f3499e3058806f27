//! Workflow graph construction.
//!
//! The graph is an explicit, immutable node table built once and passed by
//! handle into the engine; no process-wide singleton, no mutable module
//! state. Edges are not stored here: the topology is closed and lives in
//! [`crate::router::successor`], so the builder only validates that every
//! [`NodeKind`] has an implementation registered.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::node::Node;
use crate::types::NodeKind;

/// Immutable, validated node table.
///
/// Cheap to clone (`Arc` per node); share one graph across engines and
/// runs.
#[derive(Clone)]
pub struct WorkflowGraph {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
}

impl WorkflowGraph {
    /// The entry node for every run.
    pub const ENTRY: NodeKind = NodeKind::Classifier;

    #[must_use]
    pub fn builder() -> WorkflowGraphBuilder {
        WorkflowGraphBuilder::default()
    }

    /// Look up a node implementation. Compilation guarantees presence.
    #[must_use]
    pub fn node(&self, kind: NodeKind) -> Arc<dyn Node> {
        Arc::clone(
            self.nodes
                .get(&kind)
                .expect("compiled graph holds every node kind"),
        )
    }
}

impl std::fmt::Debug for WorkflowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("no implementation registered for node {kind}")]
    #[diagnostic(
        code(noteflow::graph::missing_node),
        help("Register every NodeKind with add_node before compiling.")
    )]
    MissingNode { kind: NodeKind },
}

/// Builder for [`WorkflowGraph`].
///
/// ```no_run
/// # use std::sync::Arc;
/// # use noteflow::graph::WorkflowGraph;
/// # use noteflow::types::NodeKind;
/// # fn nodes() -> Vec<(NodeKind, Arc<dyn noteflow::node::Node>)> { vec![] }
/// let mut builder = WorkflowGraph::builder();
/// for (kind, node) in nodes() {
///     builder = builder.add_node_arc(kind, node);
/// }
/// let graph = builder.compile()?;
/// # Ok::<(), noteflow::graph::GraphError>(())
/// ```
#[derive(Default)]
pub struct WorkflowGraphBuilder {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
}

impl WorkflowGraphBuilder {
    #[must_use]
    pub fn add_node(self, kind: NodeKind, node: impl Node + 'static) -> Self {
        self.add_node_arc(kind, Arc::new(node))
    }

    #[must_use]
    pub fn add_node_arc(mut self, kind: NodeKind, node: Arc<dyn Node>) -> Self {
        if self.nodes.insert(kind, node).is_some() {
            tracing::warn!(%kind, "replacing previously registered node");
        }
        self
    }

    /// Validate and freeze the graph. Fails if any [`NodeKind`] is missing.
    pub fn compile(self) -> Result<WorkflowGraph, GraphError> {
        for kind in NodeKind::ALL {
            if !self.nodes.contains_key(&kind) {
                return Err(GraphError::MissingNode { kind });
            }
        }
        Ok(WorkflowGraph { nodes: self.nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeContext, NodeError, NodeOutcome, NodePartial};
    use crate::state::StateSnapshot;
    use async_trait::async_trait;

    struct NoopNode;

    #[async_trait]
    impl Node for NoopNode {
        async fn run(
            &self,
            _snapshot: StateSnapshot,
            _ctx: NodeContext,
        ) -> Result<NodeOutcome, NodeError> {
            Ok(NodeOutcome::advance(NodePartial::default()))
        }
    }

    #[test]
    fn compile_requires_every_node() {
        let err = WorkflowGraph::builder()
            .add_node(NodeKind::Classifier, NoopNode)
            .compile()
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingNode { .. }));
    }

    #[test]
    fn complete_graph_compiles() {
        let mut builder = WorkflowGraph::builder();
        for kind in NodeKind::ALL {
            builder = builder.add_node(kind, NoopNode);
        }
        let graph = builder.compile().unwrap();
        for kind in NodeKind::ALL {
            let _ = graph.node(kind);
        }
    }
}
