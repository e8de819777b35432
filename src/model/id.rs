//! Node and layer identifiers.
//!
//! A [`NodeId`] packs an 8-bit category character and a 56-bit sequence
//! number into one `u64`:
//!
//! ```text
//!  63        56 55                                                  0
//! +------------+-----------------------------------------------------+
//! |  category  |                      index                          |
//! +------------+-----------------------------------------------------+
//! ```
//!
//! Plain integer ids are ids whose category is `'\0'`, so static-layer
//! nodes can be addressed as `NodeId::from(3)` while dynamic-layer nodes
//! use symbols such as `a(3)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const CATEGORY_BITS: u32 = 8;
const INDEX_BITS: u32 = u64::BITS - CATEGORY_BITS;

/// Largest sequence number a [`NodeSymbol`] can carry.
pub const MAX_INDEX: u64 = (1 << INDEX_BITS) - 1;

/// Largest code point usable as a category tag.
pub const MAX_CATEGORY: u32 = (1 << CATEGORY_BITS) - 1;

/// Opaque node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Encode a category and sequence number into an id.
    pub fn encode(category: char, index: u64) -> Result<Self> {
        NodeSymbol::new(category, index).map(Into::into)
    }

    /// Recover the category and sequence number.
    pub fn decode(self) -> NodeSymbol {
        NodeSymbol::from(self)
    }

    pub fn category(self) -> char {
        char::from((self.0 >> INDEX_BITS) as u8)
    }

    pub fn index(self) -> u64 {
        self.0 & MAX_INDEX
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        NodeId(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let category = self.category();
        if category == '\0' {
            write!(f, "{}", self.0)
        } else {
            write!(f, "{}({})", category, self.index())
        }
    }
}

/// Decoded form of a [`NodeId`]: category tag plus per-category index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeSymbol {
    category: char,
    index: u64,
}

impl NodeSymbol {
    /// Build a symbol, failing with [`Error::IdentifierOverflow`] when either
    /// field does not fit its bit budget.
    pub fn new(category: char, index: u64) -> Result<Self> {
        if category as u32 > MAX_CATEGORY || index > MAX_INDEX {
            return Err(Error::IdentifierOverflow { category, index });
        }
        Ok(Self { category, index })
    }

    pub fn category(&self) -> char {
        self.category
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn id(&self) -> NodeId {
        NodeId(((self.category as u64) << INDEX_BITS) | self.index)
    }
}

impl From<NodeSymbol> for NodeId {
    fn from(symbol: NodeSymbol) -> Self {
        symbol.id()
    }
}

impl From<NodeId> for NodeSymbol {
    fn from(id: NodeId) -> Self {
        Self { category: id.category(), index: id.index() }
    }
}

impl fmt::Display for NodeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.category, self.index)
    }
}

/// Layer identifier. The associated constants name the conventional
/// hierarchy; any other number is a valid layer too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

impl LayerId {
    pub const MESH: LayerId = LayerId(1);
    pub const OBJECTS: LayerId = LayerId(2);
    /// Agents share the objects layer, in their own dynamic layers.
    pub const AGENTS: LayerId = LayerId(2);
    pub const PLACES: LayerId = LayerId(3);
    pub const ROOMS: LayerId = LayerId(4);
    pub const BUILDINGS: LayerId = LayerId(5);

    /// Layers a graph accepts when none are configured.
    pub const STANDARD: [LayerId; 4] = [Self::OBJECTS, Self::PLACES, Self::ROOMS, Self::BUILDINGS];
}

impl From<u64> for LayerId {
    fn from(raw: u64) -> Self {
        LayerId(raw)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The container that owns a node: a static layer, or the dynamic layer
/// for one category within a layer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerKey {
    pub layer: LayerId,
    pub prefix: Option<char>,
}

impl LayerKey {
    pub fn fixed(layer: LayerId) -> Self {
        Self { layer, prefix: None }
    }

    pub fn dynamic(layer: LayerId, prefix: char) -> Self {
        Self { layer, prefix: Some(prefix) }
    }

    pub fn is_dynamic(&self) -> bool {
        self.prefix.is_some()
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{}[{}]", self.layer, prefix),
            None => write!(f, "{}", self.layer),
        }
    }
}
