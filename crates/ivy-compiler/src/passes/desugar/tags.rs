//! Jump tag generation.

/// Hands out jump-label names `a`..`z`, then `a1`..`z1`, `a2`, ...
///
/// Owned by a single desugaring call, so independent compiles never share
/// a counter.
#[derive(Debug, Default)]
pub struct JumpTags {
    next: usize,
}

impl JumpTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next unused tag.
    pub fn next_tag(&mut self) -> String {
        let index = self.next;
        self.next += 1;

        let letter = (b'a' + (index % 26) as u8) as char;
        match index / 26 {
            0 => letter.to_string(),
            round => format!("{letter}{round}"),
        }
    }

    /// A fresh `(else, end)` pair for one conditional.
    pub fn next_pair(&mut self) -> (String, String) {
        let else_tag = self.next_tag();
        let end_tag = self.next_tag();
        (else_tag, end_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_then_numbered_rounds() {
        let mut tags = JumpTags::new();
        let all: Vec<String> = (0..54).map(|_| tags.next_tag()).collect();
        assert_eq!(all[0], "a");
        assert_eq!(all[25], "z");
        assert_eq!(all[26], "a1");
        assert_eq!(all[51], "z1");
        assert_eq!(all[52], "a2");
    }

    #[test]
    fn independent_generators() {
        let mut first = JumpTags::new();
        let mut second = JumpTags::new();
        assert_eq!(first.next_pair(), ("a".to_string(), "b".to_string()));
        assert_eq!(second.next_pair(), ("a".to_string(), "b".to_string()));
        assert_eq!(first.next_pair(), ("c".to_string(), "d".to_string()));
    }
}
