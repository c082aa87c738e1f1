// Decode-session block store.
//
// Rebuilt by replaying frame deltas in order. Merging validates the delta
// shape (block bodies and sequence lengths) and the reference discipline:
// a frame may only reference IDs introduced by itself or an earlier frame,
// and may never redefine an ID with different content.

use std::collections::{BTreeMap, HashMap};

use super::{DedupError, IdSpace, BLOCKS_PER_SUPER, BLOCK_SIZE, SUPER_BLOCK_SIZE};

/// ID-addressed block and superblock tables for one decode session.
#[derive(Debug)]
pub struct BlockStore {
    blocks: HashMap<u32, Vec<u8>>,
    supers: HashMap<u32, Vec<u32>>,
}

impl BlockStore {
    /// A fresh store, pre-seeded with the reserved zero entries. The
    /// encoder never emits them, so they must exist before frame 0.
    pub fn new() -> Self {
        let mut blocks = HashMap::new();
        blocks.insert(0, vec![0u8; BLOCK_SIZE]);
        let mut supers = HashMap::new();
        supers.insert(0, vec![0u32; BLOCKS_PER_SUPER]);
        Self { blocks, supers }
    }

    /// Merge one frame's delta tables into the live store.
    ///
    /// Blocks land first so that this frame's superblocks may reference
    /// them. Every block ID a new superblock references must exist by the
    /// time the superblock lands.
    pub fn merge(
        &mut self,
        new_blocks: &BTreeMap<u32, Vec<u8>>,
        new_super_blocks: &BTreeMap<u32, Vec<u32>>,
    ) -> Result<(), DedupError> {
        for (&id, body) in new_blocks {
            if body.len() != BLOCK_SIZE {
                return Err(DedupError::BadBlockLen {
                    id,
                    len: body.len(),
                });
            }
            match self.blocks.get(&id) {
                Some(existing) if existing != body => {
                    return Err(DedupError::Duplicate {
                        space: IdSpace::Block,
                        id,
                    })
                }
                Some(_) => {}
                None => {
                    self.blocks.insert(id, body.clone());
                }
            }
        }

        for (&id, sequence) in new_super_blocks {
            if sequence.len() != BLOCKS_PER_SUPER {
                return Err(DedupError::BadSuperLen {
                    id,
                    len: sequence.len(),
                });
            }
            for &bid in sequence {
                if !self.blocks.contains_key(&bid) {
                    return Err(DedupError::Unknown {
                        space: IdSpace::Block,
                        id: bid,
                    });
                }
            }
            match self.supers.get(&id) {
                Some(existing) if existing != sequence => {
                    return Err(DedupError::Duplicate {
                        space: IdSpace::Super,
                        id,
                    })
                }
                Some(_) => {}
                None => {
                    self.supers.insert(id, sequence.clone());
                }
            }
        }
        Ok(())
    }

    /// Expand a frame's superblock sequence back into its aligned buffer.
    pub fn rehydrate(&self, super_sequence: &[u32]) -> Result<Vec<u8>, DedupError> {
        let mut aligned = Vec::with_capacity(super_sequence.len() * SUPER_BLOCK_SIZE);
        for &sid in super_sequence {
            let sequence = self.supers.get(&sid).ok_or(DedupError::Unknown {
                space: IdSpace::Super,
                id: sid,
            })?;
            for &bid in sequence {
                let body = self.blocks.get(&bid).ok_or(DedupError::Unknown {
                    space: IdSpace::Block,
                    id: bid,
                })?;
                aligned.extend_from_slice(body);
            }
        }
        Ok(aligned)
    }
}

impl Default for BlockStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
