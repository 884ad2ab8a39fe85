// SPDX-License-Identifier: MIT

//! Operations stream decoder (spec §4.2).

use rdt_core::ElementKind;

use crate::error::DecodeError;
use crate::string_table::StringTable;

/// A single decoded tree mutation. Opcodes whose payload is consumed but
/// otherwise ignored (`UPDATE_TREE_BASE_DURATION`, `UPDATE_ERRORS_OR_WARNINGS`,
/// `SET_SUBTREE_MODE`, the suspense-tree opcodes, `APPLIED_ACTIVITY_SLICE_CHANGE`)
/// never produce an `Op` — they only advance the cursor and, for the
/// suspense range, latch extended-ADD detection.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Add {
        id: u32,
        kind: ElementKind,
        parent_id: Option<u32>,
        display_name: String,
        key: Option<String>,
    },
    Remove {
        ids: Vec<u32>,
    },
    ReorderChildren {
        parent_id: u32,
        child_ids: Vec<u32>,
    },
    RemoveRoot,
}

/// A decoded batch: header plus the ordered tree-relevant operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub renderer_id: u32,
    pub root_id: u32,
    pub ops: Vec<Op>,
}

/// Stateful decoder for one connection's operations stream.
///
/// Carries the extended-ADD latch across batches: per spec §4.2/§9, once a
/// suspense opcode (8..12) has been seen on this connection, every
/// subsequent non-root ADD — in this batch and all later ones — is parsed
/// in the extended (8-value) shape. This mirrors a real, documented
/// ambiguity in the source format; we do not attempt to disambiguate it
/// further.
#[derive(Debug, Clone, Default)]
pub struct OperationsDecoder {
    extended_add: bool,
}

impl OperationsDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode_batch(&mut self, ints: &[i64]) -> Result<Batch, DecodeError> {
        let mut cur = Cursor::new(ints);
        let renderer_id = cur.read()?.max(0) as u32;
        let root_id = cur.read()?.max(0) as u32;
        let table_size = cur.read()?;
        if table_size < 0 {
            return Err(DecodeError::TruncatedOperation);
        }
        let table_size = table_size as usize;
        let table = StringTable::decode(cur.remaining(), table_size)?;
        cur.advance(table_size);

        let mut ops = Vec::new();
        while !cur.is_empty() {
            let opcode = cur.read()?;
            match opcode {
                1 => ops.push(self.decode_add(&mut cur, &table)?),
                2 => {
                    let count = cur.read()?.max(0) as usize;
                    let ids = cur.read_n(count)?.iter().map(|&v| v as u32).collect();
                    ops.push(Op::Remove { ids });
                }
                3 => {
                    let parent_id = cur.read()?.max(0) as u32;
                    let count = cur.read()?.max(0) as usize;
                    let child_ids = cur.read_n(count)?.iter().map(|&v| v as u32).collect();
                    ops.push(Op::ReorderChildren { parent_id, child_ids });
                }
                4 => {
                    cur.read()?; // id
                    cur.read()?; // durationScaled
                }
                5 => {
                    cur.read()?; // id
                    cur.read()?; // numErrors
                    cur.read()?; // numWarnings
                }
                6 => ops.push(Op::RemoveRoot),
                7 => {
                    cur.read()?; // id
                    cur.read()?; // mode
                }
                8 => {
                    self.extended_add = true;
                    cur.read()?; // fiberId
                    cur.read()?; // parentId
                    cur.read()?; // nameStrId
                    cur.read()?; // isSuspended
                    skip_rects(&mut cur)?;
                }
                9 => {
                    self.extended_add = true;
                    let count = cur.read()?.max(0) as usize;
                    cur.read_n(count)?;
                }
                10 => {
                    self.extended_add = true;
                    cur.read()?; // parentId
                    let count = cur.read()?.max(0) as usize;
                    cur.read_n(count)?;
                }
                11 => {
                    self.extended_add = true;
                    cur.read()?; // fiberId
                    skip_rects(&mut cur)?;
                }
                12 => {
                    self.extended_add = true;
                    let changes = cur.read()?.max(0) as usize;
                    cur.read_n(changes.saturating_mul(4))?;
                }
                13 => {
                    cur.read()?; // id — not in the suspense latch range (8..13)
                }
                _ => {
                    // Unknown opcode: tolerate by advancing one integer (the
                    // opcode itself) and continuing (spec §4.2, §9).
                }
            }
        }

        Ok(Batch { renderer_id, root_id, ops })
    }

    fn decode_add(&self, cur: &mut Cursor<'_>, table: &StringTable) -> Result<Op, DecodeError> {
        let id = cur.read()?.max(0) as u32;
        let kind_code = cur.read()?;

        if kind_code == 11 {
            // Root: trailing payload is four flags, not parent/owner/name/key.
            cur.read_n(4)?;
            return Ok(Op::Add {
                id,
                kind: ElementKind::Other,
                parent_id: None,
                display_name: "Root".to_string(),
                key: None,
            });
        }

        let kind = ElementKind::from_wire(kind_code);
        let parent_id = cur.read()?.max(0) as u32;
        cur.read()?; // ownerId — not stored on Node
        let name_str_id = cur.read()?;
        let key_str_id = cur.read()?;
        if self.extended_add {
            cur.read()?; // namePropStrId — not surfaced on Node
        }

        let display_name = table.get(name_str_id).map(str::to_string).unwrap_or_else(|| {
            if kind == ElementKind::Host { "HostComponent".to_string() } else { "Anonymous".to_string() }
        });
        let key = table.get(key_str_id).map(str::to_string);

        Ok(Op::Add { id, kind, parent_id: Some(parent_id), display_name, key })
    }
}

fn skip_rects(cur: &mut Cursor<'_>) -> Result<(), DecodeError> {
    let count = cur.read()?;
    if count == -1 {
        return Ok(());
    }
    if count < 0 {
        return Err(DecodeError::TruncatedOperation);
    }
    cur.read_n((count as usize).saturating_mul(4))?;
    Ok(())
}

struct Cursor<'a> {
    ints: &'a [i64],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(ints: &'a [i64]) -> Self {
        Self { ints, pos: 0 }
    }

    fn read(&mut self) -> Result<i64, DecodeError> {
        let v = *self.ints.get(self.pos).ok_or(DecodeError::TruncatedOperation)?;
        self.pos += 1;
        Ok(v)
    }

    fn read_n(&mut self, n: usize) -> Result<&'a [i64], DecodeError> {
        if self.pos + n > self.ints.len() {
            return Err(DecodeError::TruncatedOperation);
        }
        let slice = &self.ints[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn remaining(&self) -> &'a [i64] {
        &self.ints[self.pos..]
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.ints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prop_assert_eq;

    fn str_entry(s: &str) -> Vec<i64> {
        let mut out = vec![s.chars().count() as i64];
        out.extend(s.chars().map(|c| c as i64));
        out
    }

    /// Builds `[rendererId, rootId, tableSize, ...table, ...ops]`.
    fn batch(renderer_id: i64, root_id: i64, table: Vec<i64>, ops: Vec<i64>) -> Vec<i64> {
        let mut out = vec![renderer_id, root_id, table.len() as i64];
        out.extend(table);
        out.extend(ops);
        out
    }

    #[test]
    fn root_add_ignores_extended_latch() {
        let table = str_entry("App");
        // opcode 1 (ADD), id 100, kind 11 (Root), then 4 flags.
        let ops = vec![1, 100, 11, 1, 1, 1, 0];
        let ints = batch(1, 100, table, ops);
        let mut decoder = OperationsDecoder::new();
        let decoded = decoder.decode_batch(&ints).unwrap();
        assert_eq!(
            decoded.ops,
            vec![Op::Add {
                id: 100,
                kind: ElementKind::Other,
                parent_id: None,
                display_name: "Root".to_string(),
                key: None,
            }]
        );
    }

    #[test]
    fn short_add_resolves_names_and_keys() {
        let table = {
            let mut t = str_entry("Shell");
            t.extend(str_entry("k1"));
            t
        };
        // ADD id=2, kind=Function(5), parent=1, owner=0, nameStrId=1, keyStrId=2
        let ops = vec![1, 2, 5, 1, 0, 1, 2];
        let ints = batch(1, 1, table, ops);
        let mut decoder = OperationsDecoder::new();
        let decoded = decoder.decode_batch(&ints).unwrap();
        assert_eq!(
            decoded.ops,
            vec![Op::Add {
                id: 2,
                kind: ElementKind::Function,
                parent_id: Some(1),
                display_name: "Shell".to_string(),
                key: Some("k1".to_string()),
            }]
        );
    }

    #[test]
    fn unresolvable_name_falls_back_by_kind() {
        let ops = vec![1, 2, 7, 1, 0, 0, 0]; // Host, nameStrId=0
        let ints = batch(1, 1, vec![], ops);
        let mut decoder = OperationsDecoder::new();
        let decoded = decoder.decode_batch(&ints).unwrap();
        match &decoded.ops[0] {
            Op::Add { display_name, key, .. } => {
                assert_eq!(display_name, "HostComponent");
                assert_eq!(key, &None);
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn suspense_opcode_latches_extended_add_for_rest_of_connection() {
        // First batch: a suspense add (opcode 8) with C=-1 rects, then a
        // normal ADD in the now-extended 8-value shape.
        let suspense_ops = vec![8, 10, 0, 0, 0, -1];
        let extended_add_ops = vec![1, 3, 5, 1, 0, 1, 0, 99]; // trailing namePropStrId=99
        let mut ops = suspense_ops;
        ops.extend(extended_add_ops);
        let ints = batch(1, 1, vec![], ops);

        let mut decoder = OperationsDecoder::new();
        let decoded = decoder.decode_batch(&ints).unwrap();
        assert!(decoder.extended_add);
        assert_eq!(decoded.ops.len(), 1);

        // A later, independent batch still uses the extended shape.
        let ints2 = batch(1, 1, vec![], vec![1, 4, 5, 1, 0, 0, 0, 0]);
        let decoded2 = decoder.decode_batch(&ints2).unwrap();
        assert_eq!(decoded2.ops.len(), 1);
    }

    #[yare::parameterized(
        remove_root = {vec![6], vec![Op::RemoveRoot]},
        reorder_no_children = {vec![3, 1, 0], vec![Op::ReorderChildren { parent_id: 1, child_ids: vec![] }]},
        remove_no_ids = {vec![2, 0], vec![Op::Remove { ids: vec![] }]},
        unknown_then_remove_root = {vec![99, 6], vec![Op::RemoveRoot]},
    )]
    fn opcode_sequences_decode_to_expected_ops(ints: Vec<i64>, expected: Vec<Op>) {
        let ints = batch(1, 1, vec![], ints);
        let mut decoder = OperationsDecoder::new();
        assert_eq!(decoder.decode_batch(&ints).unwrap().ops, expected);
    }

    #[test]
    fn unknown_opcode_advances_by_one_and_resyncs() {
        // opcode 42 is unknown; next op (REMOVE_ROOT, 6) should parse fine.
        let ints = batch(1, 1, vec![], vec![42, 6]);
        let mut decoder = OperationsDecoder::new();
        let decoded = decoder.decode_batch(&ints).unwrap();
        assert_eq!(decoded.ops, vec![Op::RemoveRoot]);
    }

    #[test]
    fn remove_cascades_all_listed_ids() {
        let ints = batch(1, 1, vec![], vec![2, 3, 10, 11, 12]);
        let mut decoder = OperationsDecoder::new();
        let decoded = decoder.decode_batch(&ints).unwrap();
        assert_eq!(decoded.ops, vec![Op::Remove { ids: vec![10, 11, 12] }]);
    }

    #[test]
    fn reorder_replaces_child_order_exactly() {
        let ints = batch(1, 1, vec![], vec![3, 1, 3, 30, 20, 10]);
        let mut decoder = OperationsDecoder::new();
        let decoded = decoder.decode_batch(&ints).unwrap();
        assert_eq!(
            decoded.ops,
            vec![Op::ReorderChildren { parent_id: 1, child_ids: vec![30, 20, 10] }]
        );
    }

    #[test]
    fn truncated_payload_is_malformed() {
        // REMOVE claims 3 ids but only 1 follows.
        let ints = batch(1, 1, vec![], vec![2, 3, 10]);
        let mut decoder = OperationsDecoder::new();
        assert_eq!(decoder.decode_batch(&ints).unwrap_err(), DecodeError::TruncatedOperation);
    }

    proptest::proptest! {
        /// No sequence of integers can make the decoder panic: it either
        /// decodes a batch or reports `DecodeError`, never anything else.
        #[test]
        fn arbitrary_int_streams_never_panic(ints in proptest::collection::vec(-5i64..200, 0..64)) {
            let mut decoder = OperationsDecoder::new();
            let _ = decoder.decode_batch(&ints);
        }

        /// A well-formed REMOVE op always cascades exactly the ids listed,
        /// regardless of how many or which ones.
        #[test]
        fn remove_cascades_exactly_the_given_ids(ids in proptest::collection::vec(0u32..10_000, 0..32)) {
            let mut ops = vec![2i64, ids.len() as i64];
            ops.extend(ids.iter().map(|&id| id as i64));
            let ints = batch(1, 1, vec![], ops);
            let mut decoder = OperationsDecoder::new();
            let decoded = decoder.decode_batch(&ints).unwrap();
            prop_assert_eq!(decoded.ops, vec![Op::Remove { ids }]);
        }
    }
}
