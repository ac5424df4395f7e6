//! Node registry and edge routing
//!
//! A graph is assembled once with [`GraphBuilder`] and frozen into a
//! [`CompiledGraph`], which is shared read-only (usually behind an `Arc`) by
//! every execution. Nodes come in three kinds:
//!
//! - **pass-through** nodes execute and immediately route onward
//! - **interrupt** nodes halt the engine until an external update arrives
//! - **terminal** nodes end the thread and have no outgoing edge
//!
//! Each non-terminal node owns exactly one outgoing [`Edge`]. A conditional
//! edge pairs a pure router `Fn(&S) -> &'static str` with a static route map;
//! a key missing from the map is reported as
//! [`WorkflowError::InvalidTransition`].
//!
//! ```text
//!   generate ──► await-approval ──approved──► post ──► done
//!                  │   ▲     └──rejected──► generate
//!                  └───┘ pending
//! ```

use crate::error::{Result, WorkflowError};
use crate::node::Node;
use crate::state::GraphState;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Identifier of a registered node
pub type NodeId = String;

/// Pure routing function over a snapshot
pub type Router<S> = Arc<dyn Fn(&S) -> &'static str + Send + Sync>;

/// Outgoing edge of a node
pub enum Edge<S> {
    /// Always proceed to the target
    Direct(NodeId),

    /// Route by the key the router returns
    Conditional {
        router: Router<S>,
        routes: HashMap<String, NodeId>,
    },
}

impl<S> Clone for Edge<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Direct(to) => Self::Direct(to.clone()),
            Self::Conditional { router, routes } => Self::Conditional {
                router: Arc::clone(router),
                routes: routes.clone(),
            },
        }
    }
}

impl<S> fmt::Debug for Edge<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(to) => f.debug_tuple("Direct").field(to).finish(),
            Self::Conditional { routes, .. } => f
                .debug_struct("Conditional")
                .field("routes", routes)
                .finish_non_exhaustive(),
        }
    }
}

impl<S> Edge<S> {
    fn targets(&self) -> Vec<&str> {
        match self {
            Self::Direct(to) => vec![to.as_str()],
            Self::Conditional { routes, .. } => routes.values().map(String::as_str).collect(),
        }
    }
}

enum Registered<S> {
    Executable(Arc<dyn Node<S>>),
    Terminal,
}

impl<S> Clone for Registered<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Executable(node) => Self::Executable(Arc::clone(node)),
            Self::Terminal => Self::Terminal,
        }
    }
}

/// Mutable graph under construction
pub struct GraphBuilder<S> {
    nodes: HashMap<NodeId, Registered<S>>,
    edges: HashMap<NodeId, Edge<S>>,
    entry: Option<NodeId>,
    error_node: Option<NodeId>,
    abandoned_node: Option<NodeId>,
    problems: Vec<String>,
}

impl<S: GraphState> GraphBuilder<S> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            error_node: None,
            abandoned_node: None,
            problems: Vec::new(),
        }
    }

    /// Register an executable node
    pub fn add_node(mut self, id: impl Into<String>, node: impl Node<S> + 'static) -> Self {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            self.problems.push(format!("Node {} registered twice", id));
        }
        self.nodes.insert(id, Registered::Executable(Arc::new(node)));
        self
    }

    /// Register a terminal node
    pub fn add_terminal(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            self.problems.push(format!("Node {} registered twice", id));
        }
        self.nodes.insert(id, Registered::Terminal);
        self
    }

    pub fn add_edge(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.insert_edge(from.into(), Edge::Direct(to.into()))
    }

    /// Add a routed edge. `routes` maps router keys to target nodes.
    pub fn add_conditional_edge<F, I, K, V>(self, from: impl Into<String>, router: F, routes: I) -> Self
    where
        F: Fn(&S) -> &'static str + Send + Sync + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let routes = routes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.insert_edge(
            from.into(),
            Edge::Conditional {
                router: Arc::new(router),
                routes,
            },
        )
    }

    fn insert_edge(mut self, from: NodeId, edge: Edge<S>) -> Self {
        if self.edges.contains_key(&from) {
            self.problems.push(format!("Node {} has more than one outgoing edge", from));
        }
        self.edges.insert(from, edge);
        self
    }

    pub fn set_entry(mut self, id: impl Into<String>) -> Self {
        self.entry = Some(id.into());
        self
    }

    /// Terminal node that failed threads are parked at
    pub fn set_error_node(mut self, id: impl Into<String>) -> Self {
        self.error_node = Some(id.into());
        self
    }

    /// Terminal node written by out-of-band abandonment
    pub fn set_abandoned_node(mut self, id: impl Into<String>) -> Self {
        self.abandoned_node = Some(id.into());
        self
    }

    /// Validate the topology and freeze it
    pub fn compile(self) -> Result<CompiledGraph<S>> {
        if let Some(problem) = self.problems.first() {
            return Err(WorkflowError::Graph(problem.clone()));
        }

        let entry = self
            .entry
            .ok_or_else(|| WorkflowError::Graph("Entry point not set".to_string()))?;
        match self.nodes.get(&entry) {
            Some(Registered::Executable(_)) => {}
            Some(Registered::Terminal) => {
                return Err(WorkflowError::Graph(format!("Entry point {} is terminal", entry)))
            }
            None => return Err(WorkflowError::Graph(format!("Entry point {} does not exist", entry))),
        }

        let error_node = self
            .error_node
            .ok_or_else(|| WorkflowError::Graph("Error node not set".to_string()))?;
        for special in std::iter::once(&error_node).chain(self.abandoned_node.iter()) {
            if !matches!(self.nodes.get(special), Some(Registered::Terminal)) {
                return Err(WorkflowError::Graph(format!(
                    "{} must be a registered terminal node",
                    special
                )));
            }
        }

        for (from, edge) in &self.edges {
            match self.nodes.get(from) {
                None => return Err(WorkflowError::Graph(format!("Edge source {} does not exist", from))),
                Some(Registered::Terminal) => {
                    return Err(WorkflowError::Graph(format!(
                        "Terminal node {} cannot have outgoing edges",
                        from
                    )))
                }
                Some(Registered::Executable(_)) => {}
            }
            if let Edge::Conditional { routes, .. } = edge {
                if routes.is_empty() {
                    return Err(WorkflowError::Graph(format!("Node {} has an empty route map", from)));
                }
            }
            for to in edge.targets() {
                if !self.nodes.contains_key(to) {
                    return Err(WorkflowError::Graph(format!(
                        "Edge target {} from {} does not exist",
                        to, from
                    )));
                }
            }
        }

        for (id, node) in &self.nodes {
            if matches!(node, Registered::Executable(_)) && !self.edges.contains_key(id) {
                return Err(WorkflowError::Graph(format!("Node {} has no outgoing edge", id)));
            }
        }

        // terminals may be unreachable; error and abandoned are written out of band
        let reached = reachable(&self.edges, &entry);
        for (id, node) in &self.nodes {
            if matches!(node, Registered::Executable(_)) && *id != entry && !reached.contains(id.as_str()) {
                return Err(WorkflowError::Graph(format!(
                    "Node {} is unreachable from entry point {}",
                    id, entry
                )));
            }
        }

        Ok(CompiledGraph {
            nodes: self.nodes,
            edges: self.edges,
            entry,
            error_node,
            abandoned_node: self.abandoned_node,
        })
    }
}

impl<S: GraphState> Default for GraphBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of routing out of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Router key, or `None` for a direct edge
    pub route_key: Option<&'static str>,
    pub target: NodeId,
}

/// Read-only, validated graph
pub struct CompiledGraph<S> {
    nodes: HashMap<NodeId, Registered<S>>,
    edges: HashMap<NodeId, Edge<S>>,
    entry: NodeId,
    error_node: NodeId,
    abandoned_node: Option<NodeId>,
}

impl<S: GraphState> CompiledGraph<S> {
    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn error_node(&self) -> &str {
        &self.error_node
    }

    pub fn abandoned_node(&self) -> Option<&str> {
        self.abandoned_node.as_deref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Sorted node identifiers
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn node(&self, id: &str) -> Option<Arc<dyn Node<S>>> {
        match self.nodes.get(id) {
            Some(Registered::Executable(node)) => Some(Arc::clone(node)),
            _ => None,
        }
    }

    pub fn is_terminal(&self, id: &str) -> bool {
        matches!(self.nodes.get(id), Some(Registered::Terminal))
    }

    pub fn is_interrupt(&self, id: &str) -> bool {
        matches!(self.nodes.get(id), Some(Registered::Executable(node)) if node.is_interrupt())
    }

    pub fn is_abandoned(&self, id: &str) -> bool {
        self.abandoned_node.as_deref() == Some(id)
    }

    pub fn edge(&self, from: &str) -> Option<&Edge<S>> {
        self.edges.get(from)
    }

    /// Keys of the route map leaving `from`, sorted. Empty for direct edges.
    pub fn route_keys(&self, from: &str) -> Vec<&str> {
        match self.edges.get(from) {
            Some(Edge::Conditional { routes, .. }) => {
                let mut keys: Vec<&str> = routes.keys().map(String::as_str).collect();
                keys.sort_unstable();
                keys
            }
            _ => Vec::new(),
        }
    }

    /// Resolve the successor of `from` for `state`
    pub fn next(&self, from: &str, state: &S) -> Result<Transition> {
        match self.edges.get(from) {
            Some(Edge::Direct(to)) => Ok(Transition {
                route_key: None,
                target: to.clone(),
            }),
            Some(Edge::Conditional { router, routes }) => {
                let key = router(state);
                match routes.get(key) {
                    Some(to) => Ok(Transition {
                        route_key: Some(key),
                        target: to.clone(),
                    }),
                    None => Err(WorkflowError::InvalidTransition {
                        node: from.to_string(),
                        route_key: key.to_string(),
                        allowed: self.route_keys(from).into_iter().map(String::from).collect(),
                    }),
                }
            }
            None if self.contains(from) => Err(WorkflowError::Graph(format!(
                "Node {} has no outgoing edge",
                from
            ))),
            None => Err(WorkflowError::UnknownNode(from.to_string())),
        }
    }

    /// Every node reachable from `from` by following edges. `from` itself is
    /// included only when it lies on a cycle.
    pub fn reachable_from<'a>(&'a self, from: &'a str) -> BTreeSet<&'a str> {
        reachable(&self.edges, from)
    }
}

fn reachable<'a, S>(edges: &'a HashMap<NodeId, Edge<S>>, from: &'a str) -> BTreeSet<&'a str> {
    let mut reached = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([from]);

    while let Some(id) = queue.pop_front() {
        if let Some(edge) = edges.get(id) {
            for to in edge.targets() {
                if reached.insert(to) {
                    queue.push_back(to);
                }
            }
        }
    }
    reached
}
