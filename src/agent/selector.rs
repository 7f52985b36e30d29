use std::collections::HashSet;

use crate::forum::Item;

/// First item in feed order that is neither seen nor locked.
///
/// The feed's own order is kept; at most one candidate is returned per call.
pub fn select_candidate<'a>(seen: &HashSet<String>, window: &'a [Item]) -> Option<&'a Item> {
    window
        .iter()
        .find(|item| !item.locked && !seen.contains(&item.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn skips_seen_and_locked_items() {
        let window = vec![
            Item::new("A", "seen one", false),
            Item::new("B", "locked one", true),
            Item::new("C", "eligible", false),
            Item::new("D", "also eligible", false),
        ];

        let picked = select_candidate(&seen(&["A"]), &window).unwrap();
        assert_eq!(picked.id, "C");
    }

    #[test]
    fn nothing_new_yields_none() {
        let window = vec![Item::new("A", "a", false), Item::new("B", "b", true)];
        assert!(select_candidate(&seen(&["A"]), &window).is_none());
        assert!(select_candidate(&seen(&[]), &[]).is_none());
    }

    #[test]
    fn locked_items_are_skipped_even_when_unseen() {
        let window = vec![Item::new("X", "x", true)];
        assert!(select_candidate(&seen(&[]), &window).is_none());
    }

    #[test]
    fn keeps_feed_order() {
        let window = vec![Item::new("z", "newest", false), Item::new("a", "older", false)];
        assert_eq!(select_candidate(&seen(&[]), &window).unwrap().id, "z");
    }
}
