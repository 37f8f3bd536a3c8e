//! Favorite-list manipulation.
//!
//! Favorites are ordered lists of references embedded in the user
//! document. Adds are idempotent; removing an absent entry is a no-op.

use uuid::Uuid;

/// Append `id` unless it is already present. Returns the new list and
/// whether it changed.
pub fn add_favorite(mut favorites: Vec<Uuid>, id: Uuid) -> (Vec<Uuid>, bool) {
    if favorites.contains(&id) {
        (favorites, false)
    } else {
        favorites.push(id);
        (favorites, true)
    }
}

/// Filter `id` out. Returns the new list and whether it changed.
pub fn remove_favorite(mut favorites: Vec<Uuid>, id: Uuid) -> (Vec<Uuid>, bool) {
    let before = favorites.len();
    favorites.retain(|fav| *fav != id);
    let changed = favorites.len() != before;
    (favorites, changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let id = Uuid::new_v4();
        let (favorites, changed) = add_favorite(vec![], id);
        assert!(changed);
        let (favorites, changed) = add_favorite(favorites, id);
        assert!(!changed);
        assert_eq!(favorites, vec![id]);
    }

    #[test]
    fn test_add_preserves_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (favorites, _) = add_favorite(vec![a], b);
        assert_eq!(favorites, vec![a, b]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let a = Uuid::new_v4();
        let (favorites, changed) = remove_favorite(vec![a], Uuid::new_v4());
        assert!(!changed);
        assert_eq!(favorites, vec![a]);
    }

    #[test]
    fn test_remove_existing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (favorites, changed) = remove_favorite(vec![a, b], a);
        assert!(changed);
        assert_eq!(favorites, vec![b]);
    }
}
