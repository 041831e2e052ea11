//! Blockable bpf() commands

use bitflags::bitflags;

bitflags! {
    /// Sub-commands of bpf() that can be denied independently of the profile.
    ///
    /// Stored in the configuration map under the `op` key; an empty set is
    /// never written.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BlockOperationSet: u32 {
        const MAP_CREATE = 1 << 0;
        const PROG_LOAD = 1 << 1;
        const BTF_LOAD = 1 << 2;
        const BPF_WRITE = 1 << 3;
    }
}

/// Keyword searched for in the `--block` argument for each operation.
pub const BLOCK_KEYWORDS: &[(&str, BlockOperationSet)] = &[
    ("map_create", BlockOperationSet::MAP_CREATE),
    ("prog_load", BlockOperationSet::PROG_LOAD),
    ("btf_load", BlockOperationSet::BTF_LOAD),
    ("bpf_write", BlockOperationSet::BPF_WRITE),
];

impl BlockOperationSet {
    /// Build the set from free-form input by independent substring tests.
    ///
    /// Separators are irrelevant: `prog_load,bpf_write`, `bpf_write prog_load`
    /// and `prog_loadprog_load` are all accepted.
    pub fn from_keywords(input: &str) -> Self {
        BLOCK_KEYWORDS
            .iter()
            .filter(|(keyword, _)| input.contains(keyword))
            .fold(Self::empty(), |set, (_, op)| set | *op)
    }

    /// Keyword names of the operations in the set, in canonical order.
    pub fn names(self) -> Vec<&'static str> {
        BLOCK_KEYWORDS
            .iter()
            .filter(|(_, op)| self.contains(*op))
            .map(|(keyword, _)| *keyword)
            .collect()
    }

    /// Value stored in the configuration map, `None` when nothing is blocked.
    pub fn mask(self) -> Option<u32> {
        if self.is_empty() {
            None
        } else {
            Some(self.bits())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_keyword() {
        assert_eq!(
            BlockOperationSet::from_keywords("prog_load"),
            BlockOperationSet::PROG_LOAD
        );
    }

    #[test]
    fn test_order_and_repetition() {
        let a = BlockOperationSet::from_keywords("prog_load,bpf_write");
        let b = BlockOperationSet::from_keywords("bpf_write prog_load bpf_write");
        assert_eq!(a, b);
        assert_eq!(a, BlockOperationSet::PROG_LOAD | BlockOperationSet::BPF_WRITE);
    }

    #[test]
    fn test_no_match_is_empty() {
        let set = BlockOperationSet::from_keywords("map,prog,everything");
        assert!(set.is_empty());
        assert_eq!(set.mask(), None);
    }

    #[test]
    fn test_names() {
        let set = BlockOperationSet::BPF_WRITE | BlockOperationSet::MAP_CREATE;
        assert_eq!(set.names(), vec!["map_create", "bpf_write"]);
        assert_eq!(set.mask(), Some(0b1001));
    }
}
