//! Multi-pattern substring matcher (Aho-Corasick)
//!
//! Patterns are inserted into a byte trie through [`AutomatonBuilder`], then
//! [`AutomatonBuilder::build`] computes failure links breadth-first and yields
//! a read-only [`PatternAutomaton`]. Matching walks the text exactly once,
//! independent of how many patterns were added.
//!
//! The builder/automaton split makes "match before build" unrepresentable:
//! only the finished automaton exposes [`PatternAutomaton::matches`].

use std::collections::VecDeque;

const ROOT: u32 = 0;

// =============================================================================
// Trie Node
// =============================================================================

#[derive(Debug, Clone, Default)]
struct Node {
    /// Outgoing edges, sorted by byte.
    edges: Vec<(u8, u32)>,
    /// Failure link. Meaningless until `build()`.
    fail: u32,
    /// Some pattern ends here, either directly or via the failure chain.
    terminal: bool,
}

impl Node {
    #[inline]
    fn edge(&self, byte: u8) -> Option<u32> {
        self.edges
            .binary_search_by_key(&byte, |&(b, _)| b)
            .ok()
            .map(|i| self.edges[i].1)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Build phase of the automaton: collects patterns into a trie.
#[derive(Debug, Clone)]
pub struct AutomatonBuilder {
    nodes: Vec<Node>,
    patterns: usize,
}

impl Default for AutomatonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AutomatonBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            patterns: 0,
        }
    }

    /// Insert a pattern. Duplicates are idempotent and the empty pattern is ignored.
    pub fn add(&mut self, pattern: impl AsRef<[u8]>) -> &mut Self {
        let bytes = pattern.as_ref();
        if bytes.is_empty() {
            return self;
        }

        let mut node = ROOT;
        for &b in bytes {
            node = match self.nodes[node as usize].edge(b) {
                Some(next) => next,
                None => {
                    let id = self.nodes.len() as u32;
                    self.nodes.push(Node::default());
                    let edges = &mut self.nodes[node as usize].edges;
                    let pos = edges.partition_point(|&(e, _)| e < b);
                    edges.insert(pos, (b, id));
                    id
                }
            };
        }

        let terminal = &mut self.nodes[node as usize].terminal;
        if !*terminal {
            *terminal = true;
            self.patterns += 1;
        }
        self
    }

    /// Number of distinct patterns added so far.
    pub fn pattern_count(&self) -> usize {
        self.patterns
    }

    /// Compute failure links and freeze the trie.
    pub fn build(mut self) -> PatternAutomaton {
        let mut queue = VecDeque::with_capacity(self.nodes.len());

        // Depth-1 nodes always fail back to the root.
        for i in 0..self.nodes[ROOT as usize].edges.len() {
            let (_, child) = self.nodes[ROOT as usize].edges[i];
            self.nodes[child as usize].fail = ROOT;
            queue.push_back(child);
        }

        while let Some(parent) = queue.pop_front() {
            for i in 0..self.nodes[parent as usize].edges.len() {
                let (byte, child) = self.nodes[parent as usize].edges[i];
                queue.push_back(child);

                let mut state = self.nodes[parent as usize].fail;
                let fail = loop {
                    if let Some(next) = self.nodes[state as usize].edge(byte) {
                        break next;
                    }
                    if state == ROOT {
                        break ROOT;
                    }
                    state = self.nodes[state as usize].fail;
                };

                // `fail` is strictly shallower, so its terminal flag is final.
                let inherited = self.nodes[fail as usize].terminal;
                let node = &mut self.nodes[child as usize];
                node.fail = fail;
                node.terminal |= inherited;
            }
        }

        PatternAutomaton {
            nodes: self.nodes,
            patterns: self.patterns,
        }
    }
}

// =============================================================================
// Automaton
// =============================================================================

/// Compiled, immutable matcher. Safe to share across threads.
#[derive(Debug, Clone)]
pub struct PatternAutomaton {
    nodes: Vec<Node>,
    patterns: usize,
}

impl Default for PatternAutomaton {
    fn default() -> Self {
        Self::empty()
    }
}

impl PatternAutomaton {
    /// An automaton with no patterns; never matches.
    pub fn empty() -> Self {
        AutomatonBuilder::new().build()
    }

    /// Returns true iff some pattern occurs as a contiguous substring of `text`.
    pub fn matches(&self, text: impl AsRef<[u8]>) -> bool {
        if self.patterns == 0 {
            return false;
        }

        let mut state = ROOT;
        for &b in text.as_ref() {
            loop {
                if let Some(next) = self.nodes[state as usize].edge(b) {
                    state = next;
                    break;
                }
                if state == ROOT {
                    break;
                }
                state = self.nodes[state as usize].fail;
            }

            if self.nodes[state as usize].terminal {
                return true;
            }
        }

        false
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns
    }

    /// Number of trie states, root included.
    pub fn state_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns == 0
    }
}

impl<P: AsRef<[u8]>> FromIterator<P> for PatternAutomaton {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut builder = AutomatonBuilder::new();
        for pattern in iter {
            builder.add(pattern);
        }
        builder.build()
    }
}
