//! Ordering of identifiers on the ring.

use crate::common::Id;

/// Returns `true` if `id` lies on the clockwise arc from `start` to `end`.
///
/// Each bound is included or excluded independently. When `start >= end` the
/// arc wraps past zero; `start == end` covers the whole ring, minus the point
/// itself when both bounds are exclusive.
pub fn between(
    id: Id,
    start: Id,
    end: Id,
    include_start: bool,
    include_end: bool,
) -> bool {
    let after_start = if include_start { id >= start } else { id > start };
    let before_end = if include_end { id <= end } else { id < end };

    if start < end {
        after_start && before_end
    } else {
        after_start || before_end
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn arc(start: u64, end: u64, include_start: bool, include_end: bool) -> Vec<u64> {
        (0..16)
            .filter(|id| between(Id(*id), Id(start), Id(end), include_start, include_end))
            .collect()
    }

    #[test]
    fn plain_interval() {
        assert_eq!(arc(3, 6, false, false), vec![4, 5]);
        assert_eq!(arc(3, 6, true, false), vec![3, 4, 5]);
        assert_eq!(arc(3, 6, false, true), vec![4, 5, 6]);
        assert_eq!(arc(3, 6, true, true), vec![3, 4, 5, 6]);
    }

    #[test]
    fn wrapping_interval() {
        assert_eq!(arc(13, 2, false, false), vec![0, 1, 14, 15]);
        assert_eq!(arc(13, 2, true, false), vec![0, 1, 13, 14, 15]);
        assert_eq!(arc(13, 2, false, true), vec![0, 1, 2, 14, 15]);
        assert_eq!(arc(13, 2, true, true), vec![0, 1, 2, 13, 14, 15]);
    }

    #[test]
    fn complementary_arcs_partition_the_ring() {
        for start in 0..16 {
            for end in 0..16 {
                if start == end {
                    continue;
                }
                for id in 0..16 {
                    let forward = between(Id(id), Id(start), Id(end), false, true);
                    let backward = between(Id(id), Id(end), Id(start), false, true);

                    assert!(forward ^ backward, "{} in ({}, {}]", id, start, end);
                }
            }
        }
    }

    #[test]
    fn degenerate_full_ring() {
        let all: Vec<u64> = (0..16).collect();

        assert_eq!(arc(7, 7, true, true), all);
        assert_eq!(arc(7, 7, true, false), all);
        assert_eq!(arc(7, 7, false, true), all);
        assert_eq!(
            arc(7, 7, false, false),
            all.iter().copied().filter(|id| *id != 7).collect::<Vec<_>>()
        );
    }
}
