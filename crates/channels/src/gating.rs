/// Parse a comma-separated list of author ids, dropping blanks.
pub fn parse_blocklist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check whether an author is on the block-list.
///
/// Ids are opaque and compared exactly after trimming.
pub fn is_blocked(author_id: &str, blocklist: &[String]) -> bool {
    let author_id = author_id.trim();
    !author_id.is_empty() && blocklist.iter().any(|id| id == author_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_blocklist_blocks_nobody() {
        assert!(parse_blocklist("").is_empty());
        assert!(!is_blocked("123", &[]));
    }

    #[test]
    fn parses_and_trims_entries() {
        let list = parse_blocklist(" 123456789 ,987654321,, ");
        assert_eq!(list, vec!["123456789", "987654321"]);
    }

    #[test]
    fn exact_match_only() {
        let list = parse_blocklist("123,456");
        assert!(is_blocked("123", &list));
        assert!(is_blocked(" 456 ", &list));
        assert!(!is_blocked("1234", &list));
        assert!(!is_blocked("", &list));
    }
}
