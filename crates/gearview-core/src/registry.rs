//! Ownership list of the scene nodes spawned for the current model
//!
//! Every node created for a loaded part or for the coordinate axes is registered
//! here under the load generation that produced it. Clearing the scene drains
//! the list, so nothing has to walk the scene graph looking for tags.

/// What a registered node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneTag {
    /// Root of a loaded CAD model
    CadPart,
    /// One of the six axis segments drawn around the model
    CoordinateAxis,
}

/// Monotonic counter identifying one model load
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

#[derive(Debug, Clone)]
struct Registered<T> {
    node: T,
    tag: SceneTag,
    generation: Generation,
}

/// Registry of tagged scene nodes, generic over the node handle type
#[derive(Debug, Clone)]
pub struct SceneRegistry<T> {
    nodes: Vec<Registered<T>>,
    generation: Generation,
}

impl<T> Default for SceneRegistry<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            generation: Generation::default(),
        }
    }
}

impl<T: Copy + PartialEq> SceneRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current load generation
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Start a new load generation and return it
    pub fn begin_generation(&mut self) -> Generation {
        self.generation = Generation(self.generation.0 + 1);
        self.generation
    }

    /// Record a node spawned for the current generation
    pub fn register(&mut self, node: T, tag: SceneTag) {
        if self.nodes.iter().any(|r| r.node == node) {
            return;
        }
        self.nodes.push(Registered {
            node,
            tag,
            generation: self.generation,
        });
    }

    /// Remove every registered node and return them for despawning
    pub fn clear(&mut self) -> Vec<T> {
        self.nodes.drain(..).map(|r| r.node).collect()
    }

    /// Forget a node that was despawned by other means
    pub fn forget(&mut self, node: T) {
        self.nodes.retain(|r| r.node != node);
    }

    /// Number of registered nodes with the given tag
    pub fn count(&self, tag: SceneTag) -> usize {
        self.nodes.iter().filter(|r| r.tag == tag).count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: T) -> bool {
        self.nodes.iter().any(|r| r.node == node)
    }

    /// Nodes registered under a given generation
    pub fn nodes_in(&self, generation: Generation) -> impl Iterator<Item = (T, SceneTag)> + '_ {
        self.nodes
            .iter()
            .filter(move |r| r.generation == generation)
            .map(|r| (r.node, r.tag))
    }
}
