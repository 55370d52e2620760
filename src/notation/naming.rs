use rustc_hash::{FxHashMap, FxHashSet};

/// Kinds of names that must also stay distinct once a target changes their case.
///
/// Tile prints tensors upper-case and indices lower-case, so `a` and `A` may
/// not both name a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Tensor,
    Index,
}

/// Hands out unique term names within one session.
///
/// Names are never shared between sessions, so two independent compilations
/// can both own a tensor called `A`.
#[derive(Debug, Default)]
pub struct NameAllocator {
    taken: FxHashSet<String>,
    folded: FxHashSet<(Namespace, String)>,
    counters: FxHashMap<String, usize>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Whether `name` is taken in `space` ignoring case.
    pub fn is_taken_in(&self, space: Namespace, name: &str) -> bool {
        self.folded.contains(&(space, name.to_uppercase()))
    }

    /// Reserves `name`, or `name` followed by the smallest free numeric suffix.
    pub fn claim(&mut self, name: &str) -> String {
        self.claim_with(None, name)
    }

    /// Like [`claim`](Self::claim), also unique ignoring case within `space`.
    pub fn claim_in(&mut self, space: Namespace, name: &str) -> String {
        self.claim_with(Some(space), name)
    }

    /// Reserves `base` followed by the next sequence number for that base.
    pub fn fresh(&mut self, base: &str) -> String {
        self.fresh_with(None, base)
    }

    pub fn fresh_in(&mut self, space: Namespace, base: &str) -> String {
        self.fresh_with(Some(space), base)
    }

    /// Reserves the name following `name` in its family (`A` → `B`, `V0` → `V1`).
    pub fn successor_in(&mut self, space: Namespace, name: &str) -> String {
        let next = next_in_family(name);
        self.claim_with(Some(space), &next)
    }

    fn claim_with(&mut self, space: Option<Namespace>, name: &str) -> String {
        if self.reserve(space, name) {
            return name.to_string();
        }
        let mut n = 0usize;
        loop {
            let candidate = format!("{name}{n}");
            if self.reserve(space, &candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn fresh_with(&mut self, space: Option<Namespace>, base: &str) -> String {
        loop {
            let counter = self.counters.entry(base.to_string()).or_insert(0);
            let candidate = format!("{base}{counter}");
            *counter += 1;
            if self.reserve(space, &candidate) {
                return candidate;
            }
        }
    }

    fn reserve(&mut self, space: Option<Namespace>, candidate: &str) -> bool {
        if self.taken.contains(candidate) {
            return false;
        }
        if let Some(space) = space {
            if !self.folded.insert((space, candidate.to_uppercase())) {
                return false;
            }
        }
        self.taken.insert(candidate.to_string())
    }
}

/// Computes the next member of a name family without reserving it.
///
/// Trailing digits are incremented; otherwise the last ASCII letter is
/// advanced. `z` and `Z` roll over to a numeric suffix.
pub fn next_in_family(name: &str) -> String {
    let digits_start = name
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);

    if let Some(start) = digits_start {
        let (prefix, digits) = name.split_at(start);
        if let Ok(n) = digits.parse::<u64>() {
            return format!("{prefix}{}", n + 1);
        }
    }

    match name.chars().last() {
        Some(c) if c.is_ascii_alphabetic() && c != 'z' && c != 'Z' => {
            let mut next = name[..name.len() - c.len_utf8()].to_string();
            next.push((c as u8 + 1) as char);
            next
        }
        Some(_) => format!("{name}0"),
        None => "T".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A", "B")]
    #[case("a", "b")]
    #[case("x", "y")]
    #[case("V0", "V1")]
    #[case("m9", "m10")]
    #[case("z", "z0")]
    #[case("Z", "Z0")]
    #[case("M_", "M_0")]
    fn test_next_in_family(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(next_in_family(name), expected);
    }

    #[test]
    fn test_claim_disambiguates() {
        let mut names = NameAllocator::new();
        assert_eq!(names.claim("A"), "A");
        assert_eq!(names.claim("A"), "A0");
        assert_eq!(names.claim("A"), "A1");
        assert!(names.is_taken("A0"));
    }

    #[test]
    fn test_fresh_is_sequential() {
        let mut names = NameAllocator::new();
        assert_eq!(names.fresh("V"), "V0");
        assert_eq!(names.fresh("V"), "V1");
        names.claim("T0");
        assert_eq!(names.fresh("T"), "T1");
    }

    #[test]
    fn test_successor_skips_taken_names() {
        let mut names = NameAllocator::new();
        names.claim_in(Namespace::Tensor, "H");
        names.claim_in(Namespace::Tensor, "I");
        assert_eq!(names.successor_in(Namespace::Tensor, "H"), "I0");
        assert_eq!(names.successor_in(Namespace::Tensor, "I"), "J");
    }

    #[test]
    fn test_case_folded_within_namespace() {
        let mut names = NameAllocator::new();
        assert_eq!(names.claim_in(Namespace::Tensor, "a"), "a");
        assert_eq!(names.claim_in(Namespace::Tensor, "A"), "A0");
        assert!(names.is_taken_in(Namespace::Tensor, "a0"));
        assert_eq!(names.fresh_in(Namespace::Tensor, "a"), "a1");

        assert_eq!(names.claim_in(Namespace::Index, "c"), "c");
        assert_eq!(names.claim_in(Namespace::Index, "C"), "C0");
        assert_eq!(names.claim_in(Namespace::Tensor, "C"), "C");
    }
}
