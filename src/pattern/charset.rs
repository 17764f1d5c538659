//! Character set algebra for generator alphabets.

use std::collections::HashSet;

use itertools::Itertools;
use rand::Rng;
use rand::seq::SliceRandom;

/// A deduplicated set of characters.
///
/// Elements keep their first-insertion order so that a seeded random source
/// always draws the same sequence for the same set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharSet {
    chars: Vec<char>,
}

impl CharSet {
    pub fn new() -> Self {
        Self { chars: Vec::new() }
    }

    /// Build a set from char-spec strings.
    ///
    /// Each spec is either a single character or an inclusive `a-z` range.
    /// Empty specs, ranges whose end precedes their start, and anything else
    /// that is not one of those two shapes are skipped.
    pub fn from_specs<I, S>(specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut chars = Vec::new();
        for spec in specs {
            let spec: Vec<char> = spec.as_ref().chars().collect();
            match spec.as_slice() {
                [c] => chars.push(*c),
                [lo, '-', hi] if lo <= hi => chars.extend(*lo..=*hi),
                _ => {}
            }
        }
        chars.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn contains(&self, ch: char) -> bool {
        self.chars.contains(&ch)
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn union(&self, other: &CharSet) -> CharSet {
        self.chars.iter().chain(&other.chars).copied().collect()
    }

    pub fn intersection(&self, other: &CharSet) -> CharSet {
        let keep: HashSet<char> = other.chars.iter().copied().collect();
        self.filtered(|ch| keep.contains(&ch))
    }

    pub fn difference(&self, other: &CharSet) -> CharSet {
        let drop: HashSet<char> = other.chars.iter().copied().collect();
        self.filtered(|ch| !drop.contains(&ch))
    }

    /// Draw one element uniformly at random, or `None` for the empty set.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<char> {
        self.chars.choose(rng).copied()
    }

    /// Like [`CharSet::draw`], rendering the empty set as the empty string.
    pub fn draw_string<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.draw(rng).map(String::from).unwrap_or_default()
    }

    fn filtered(&self, keep: impl Fn(char) -> bool) -> CharSet {
        CharSet {
            chars: self.chars.iter().copied().filter(|&ch| keep(ch)).collect(),
        }
    }
}

impl FromIterator<char> for CharSet {
    fn from_iter<T: IntoIterator<Item = char>>(iter: T) -> Self {
        CharSet {
            chars: iter.into_iter().unique().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    fn set(specs: &[&str]) -> CharSet {
        CharSet::from_specs(specs)
    }

    #[test]
    fn test_single_chars_and_ranges() {
        let cs = set(&["x", "a-c"]);
        assert_eq!(cs.chars(), &['x', 'a', 'b', 'c']);
    }

    #[test]
    fn test_invalid_specs_are_ignored() {
        let cs = set(&["", "z-a", "abc", "a_c", "q"]);
        assert_eq!(cs.chars(), &['q']);
    }

    #[test]
    fn test_duplicates_collapse() {
        let cs = set(&["a-c", "b", "c-d"]);
        assert_eq!(cs.len(), 4);
        assert_eq!(cs.chars(), &['a', 'b', 'c', 'd']);
    }

    #[test]
    fn test_dash_alone_is_a_literal() {
        assert_eq!(set(&["-"]).chars(), &['-']);
        assert_eq!(set(&["--/"]).chars(), &['-', '.', '/']);
    }

    #[test]
    fn test_union_keeps_left_order() {
        let cs = set(&["c", "a"]).union(&set(&["b", "a"]));
        assert_eq!(cs.chars(), &['c', 'a', 'b']);
    }

    #[test]
    fn test_intersection_and_difference() {
        let base = set(&["a-f"]);
        let vowels = set(&["a", "e", "i", "o", "u"]);
        assert_eq!(base.intersection(&vowels).chars(), &['a', 'e']);
        assert_eq!(base.difference(&vowels).chars(), &['b', 'c', 'd', 'f']);
    }

    #[test]
    fn test_draw_stays_within_set() {
        let mut rng = Mcg128Xsl64::seed_from_u64(7);
        let cs = set(&["0-9"]);
        for _ in 0..200 {
            let ch = cs.draw(&mut rng).unwrap();
            assert!(cs.contains(ch), "drew {ch:?}");
        }
    }

    #[test]
    fn test_draw_from_empty_set_is_empty_string() {
        let mut rng = Mcg128Xsl64::seed_from_u64(7);
        let empty = set(&["a"]).difference(&set(&["a"]));
        assert!(empty.is_empty());
        assert_eq!(empty.draw(&mut rng), None);
        assert_eq!(empty.draw_string(&mut rng), "");
    }
}
