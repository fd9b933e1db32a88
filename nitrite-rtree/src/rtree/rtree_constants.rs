//! Constants for the in-memory R-Tree and its binary format.

/// Inline depth of the iterator stack; deeper trees spill to the heap
pub const ITERATOR_STACK_DEPTH: usize = 32;

/// Deepest root level accepted when loading a saved tree
pub const MAX_LOAD_LEVEL: u32 = 64;

/// Magic number for file format identification
pub const MAGIC: u32 = 0x4E525452; // "NRTR" - Nitrite R-Tree

/// File format version
pub const VERSION: u32 = 1;
