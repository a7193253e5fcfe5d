/// Get the index into a row-major `2^nindices` square matrix.
#[inline]
pub fn get_flat_index(nindices: usize, i: usize, j: usize) -> usize {
    let mat_side = 1 << nindices;
    (i * mat_side) + j
}

/// Get the `bit_index` bit value from `num`.
///
/// # Example
/// ```
/// use qip_kernels::utils::get_bit;
/// let n = get_bit(2, 1);
/// assert_eq!(n, true);
/// ```
#[inline]
pub fn get_bit(num: usize, bit_index: usize) -> bool {
    ((num >> bit_index) & 1) != 0
}

/// Extracts bits from a number in a particular order, bit `i` of the output is bit
/// `indices[i]` of `num`.
///
/// # Example
///
/// ```
/// use qip_kernels::utils::extract_bits;
///
/// assert_eq!(extract_bits(0b1010, &[3, 0]), 0b01);
/// ```
#[inline]
pub fn extract_bits(num: usize, indices: &[usize]) -> usize {
    indices.iter().enumerate().fold(0, |acc, (i, index)| {
        let bit = (num >> index) & 1;
        acc | (bit << i)
    })
}

/// Inverse of `extract_bits`: scatter the low bits of `bits` to the positions in `indices`.
///
/// # Example
///
/// ```
/// use qip_kernels::utils::deposit_bits;
///
/// assert_eq!(deposit_bits(0b01, &[3, 0]), 0b1000);
/// assert_eq!(deposit_bits(0b11, &[3, 0]), 0b1001);
/// ```
#[inline]
pub fn deposit_bits(bits: usize, indices: &[usize]) -> usize {
    indices
        .iter()
        .enumerate()
        .fold(0, |acc, (i, index)| acc | (((bits >> i) & 1) << index))
}

/// Mask with a bit set at every position in `indices`.
///
/// # Example
/// ```
/// use qip_kernels::utils::make_mask;
/// assert_eq!(make_mask(&[0, 2]), 0b101);
/// assert_eq!(make_mask(&[]), 0);
/// ```
#[inline]
pub fn make_mask(indices: &[usize]) -> usize {
    indices.iter().fold(0, |acc, index| acc | (1 << index))
}

/// Insert a zero at bit position `bit_index`, shifting all higher bits up by one.
///
/// # Example
/// ```
/// use qip_kernels::utils::insert_zero_bit;
/// assert_eq!(insert_zero_bit(0b111, 1), 0b1101);
/// assert_eq!(insert_zero_bit(0b1, 0), 0b10);
/// ```
#[inline]
pub fn insert_zero_bit(num: usize, bit_index: usize) -> usize {
    let low = num & ((1 << bit_index) - 1);
    ((num >> bit_index) << (bit_index + 1)) | low
}
