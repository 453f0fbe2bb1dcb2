//! # Alphabet
//!
//! The 20 canonical amino acids plus `X` for anything else.

/// One-letter codes in index order. `X` is the catch-all for non-canonical residues.
pub const ALPHABET: [char; 21] = [
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W',
    'Y', 'X',
];

#[rustfmt::skip]
pub fn aa1to_int(aa: char) -> u32 {
    match aa.to_ascii_uppercase() {
        'A' => 0, 'C' => 1, 'D' => 2,
        'E' => 3, 'F' => 4, 'G' => 5,
        'H' => 6, 'I' => 7, 'K' => 8,
        'L' => 9, 'M' => 10, 'N' => 11,
        'P' => 12, 'Q' => 13, 'R' => 14,
        'S' => 15, 'T' => 16, 'V' => 17,
        'W' => 18, 'Y' => 19, _   => 20,
    }
}

#[rustfmt::skip]
pub fn int_to_aa1(aa_int: u32) -> char {
    match aa_int {
        0 => 'A', 1 => 'C', 2 => 'D',
        3 => 'E', 4 => 'F', 5 => 'G',
        6 => 'H', 7 => 'I', 8 => 'K',
        9 => 'L', 10 => 'M', 11 => 'N',
        12 => 'P', 13 => 'Q', 14 => 'R',
        15 => 'S', 16 => 'T', 17 => 'V',
        18 => 'W', 19 => 'Y', _ => 'X',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_indices_agree() {
        for (idx, aa) in ALPHABET.iter().enumerate() {
            assert_eq!(aa1to_int(*aa), idx as u32);
            assert_eq!(int_to_aa1(idx as u32), *aa);
        }
    }

    #[test]
    fn test_noncanonical_maps_to_x() {
        assert_eq!(aa1to_int('B'), 20);
        assert_eq!(aa1to_int('*'), 20);
        assert_eq!(aa1to_int('m'), 10);
        assert_eq!(aa1to_int('U'), 20);
        assert_eq!(int_to_aa1(aa1to_int('w')), 'W');
    }
}
