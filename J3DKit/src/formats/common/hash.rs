//! Name hashes stored next to J3D and RARC string entries
//!
//! Both hashes are polynomial rolling hashes over the Unicode scalar values
//! of the name, truncated to 16 bits. They differ in how the multiplier is
//! chosen and in where truncation happens, so each codec must call its own.

/// Hash used by J3D animation string tables.
///
/// The multiplier is 1 for names of at most one character, 2 for two
/// characters and 3 otherwise.
#[must_use]
pub fn hash_name(name: &str) -> u16 {
    let multiplier: u32 = match name.chars().count() {
        0 | 1 => 1,
        2 => 2,
        _ => 3,
    };
    name.chars().fold(0u32, |hash, c| {
        hash.wrapping_mul(multiplier).wrapping_add(c as u32) & 0xFFFF
    }) as u16
}

/// Hash used by RARC node and entry records.
///
/// The multiplier is chosen from `len + 1` (1 below 2, 2 at 2, 3 otherwise)
/// and the hash is truncated after both the multiply and the add.
#[must_use]
pub fn hash_archive_name(name: &str) -> u16 {
    let multiplier: u32 = match name.chars().count() + 1 {
        0 | 1 => 1,
        2 => 2,
        _ => 3,
    };
    name.chars().fold(0u32, |hash, c| {
        let hash = hash.wrapping_mul(multiplier) & 0xFFFF;
        hash.wrapping_add(c as u32) & 0xFFFF
    }) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_name_multipliers() {
        assert_eq!(hash_name(""), 0);
        assert_eq!(hash_name("a"), 97);
        assert_eq!(hash_name("ab"), 97 * 2 + 98);
        assert_eq!(hash_name("abc"), (97 * 3 + 98) * 3 + 99);
    }

    #[test]
    fn test_hash_name_truncates() {
        let expected = "mat_body_long_name"
            .chars()
            .fold(0u32, |h, c| (h * 3 + c as u32) & 0xFFFF);
        assert_eq!(u32::from(hash_name("mat_body_long_name")), expected);
    }

    #[test]
    fn test_archive_hash() {
        assert_eq!(hash_archive_name(""), 0);
        assert_eq!(hash_archive_name("."), 46);
        assert_eq!(hash_archive_name(".."), 46 * 3 + 46);
        assert_eq!(hash_archive_name("ab"), 97 * 3 + 98);
    }
}
