/// Splits a record set into at most `count` contiguous, order-preserving
/// slices sized by ceiling division. The last partition may be smaller, and
/// when `count` exceeds what the ceiling size allows fewer partitions come
/// back. Empty input (or a zero count) yields no partitions.
pub fn partition<T>(records: Vec<T>, count: usize) -> Vec<Vec<T>> {
    if records.is_empty() || count == 0 {
        return Vec::new();
    }

    let size = records.len().div_ceil(count);
    let mut partitions = Vec::with_capacity(count);
    let mut rest = records.into_iter();

    loop {
        let chunk: Vec<T> = rest.by_ref().take(size).collect();
        if chunk.is_empty() {
            break;
        }
        partitions.push(chunk);
    }

    partitions
}
