/// Stable LSD radix sort of 32-bit keys, 8 bits per pass.
///
/// Writes into `sorted` the permutation of `0..keys.len()` that orders
/// `keys`; the keys themselves are not moved. O(N) per pass using counting
/// sort with 256 buckets. `scratch` is resized to fit and reused across
/// calls.
pub fn radix_sort(keys: &[u32], sorted: &mut Vec<u32>, scratch: &mut Vec<u32>) {
    let n = keys.len();
    sorted.clear();
    sorted.extend(0..n as u32);
    scratch.clear();
    scratch.resize(n, 0);

    for pass in 0..4 {
        let shift = pass * 8;
        let digit = |i: u32| ((keys[i as usize] >> shift) & 0xff) as usize;

        // 1. Histogram of this digit
        let mut offsets = [0u32; 256];
        for &i in sorted.iter() {
            offsets[digit(i)] += 1;
        }

        // 2. Exclusive prefix sum -> bucket start
        let mut sum = 0;
        for offset in offsets.iter_mut() {
            let count = *offset;
            *offset = sum;
            sum += count;
        }

        // 3. Scatter in current order, which keeps the sort stable
        for &i in sorted.iter() {
            let d = digit(i);
            scratch[offsets[d] as usize] = i;
            offsets[d] += 1;
        }

        std::mem::swap(sorted, scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorts_multi_byte_keys() {
        let keys = [0x0100_0002, 5, 0x0001_0000, 5, 0, 0xff00_0000];
        let mut sorted = Vec::new();
        let mut scratch = Vec::new();
        radix_sort(&keys, &mut sorted, &mut scratch);

        let ordered: Vec<u32> = sorted.iter().map(|&i| keys[i as usize]).collect();
        assert_eq!(ordered, vec![0, 5, 5, 0x0001_0000, 0x0100_0002, 0xff00_0000]);
        // equal keys keep their input order
        assert_eq!(&sorted[1..3], &[1, 3]);
    }

    #[test]
    fn test_empty_input() {
        let mut sorted = vec![7];
        let mut scratch = Vec::new();
        radix_sort(&[], &mut sorted, &mut scratch);
        assert!(sorted.is_empty());
    }
}
