//! Round-robin partitioning of consumers over worker threads

/// Split `items` into `chunk_count` chunks by round-robin assignment.
///
/// Chunk `i` receives the items at positions `i`, `i + chunk_count`,
/// `i + 2 * chunk_count`, and so on. Chunk sizes differ by at most one, so
/// the consumer load is balanced across worker threads. Trailing chunks may
/// be empty when there are fewer items than chunks.
pub(crate) fn split_round_robin<T>(items: Vec<T>, chunk_count: usize) -> Vec<Vec<T>> {
    let chunk_count = chunk_count.max(1);
    let mut chunks: Vec<Vec<T>> = (0..chunk_count).map(|_| Vec::new()).collect();

    for (index, item) in items.into_iter().enumerate() {
        chunks[index % chunk_count].push(item);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_rotate_over_chunks() {
        let chunks = split_round_robin(vec![0, 1, 2, 3, 4, 5, 6], 3);

        assert_eq!(chunks, vec![vec![0, 3, 6], vec![1, 4], vec![2, 5]]);
    }

    #[test]
    fn fewer_items_than_chunks_leaves_empty_tails() {
        let chunks = split_round_robin(vec!["a", "b"], 4);

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], vec!["a"]);
        assert_eq!(chunks[1], vec!["b"]);
        assert!(chunks[2].is_empty());
        assert!(chunks[3].is_empty());
    }

    #[test]
    fn chunk_sizes_differ_by_at_most_one() {
        let chunks = split_round_robin((0..111).collect::<Vec<_>>(), 11);

        let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
        let max = sizes.iter().max().unwrap();
        let min = sizes.iter().min().unwrap();

        assert!(max - min <= 1);
        assert_eq!(sizes.iter().sum::<usize>(), 111);
    }

    #[test]
    fn zero_chunk_count_is_promoted_to_one() {
        let chunks = split_round_robin(vec![1, 2, 3], 0);

        assert_eq!(chunks, vec![vec![1, 2, 3]]);
    }
}
