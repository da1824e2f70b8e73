//! Reordering primitives for multi-valued fields
//!
//! Copy-on-write helpers shared by every multi-valued field type. The input
//! slice is never modified.
//!
//! Indices are a caller contract; an out-of-range index panics.

/// Direction of an adjacent move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards index 0
    Up,
    /// Towards the end of the list
    Down,
}

/// Return a copy of `list` with the element at `from` relocated to `to`.
///
/// # Panics
///
/// Panics if `from` or `to` is not within `0..list.len()`.
pub fn move_item<T: Clone>(list: &[T], from: usize, to: usize) -> Vec<T> {
    assert!(
        from < list.len(),
        "move_item: from index {} out of range for length {}",
        from,
        list.len()
    );
    assert!(
        to < list.len(),
        "move_item: to index {} out of range for length {}",
        to,
        list.len()
    );

    let mut result = list.to_vec();
    if from != to {
        let item = result.remove(from);
        result.insert(to, item);
    }
    result
}

/// Return a copy of `list` with `value` inserted at `index`.
///
/// # Panics
///
/// Panics if `index > list.len()`.
pub fn insert_at<T: Clone>(list: &[T], index: usize, value: T) -> Vec<T> {
    assert!(
        index <= list.len(),
        "insert_at: index {} out of range for length {}",
        index,
        list.len()
    );

    let mut result = Vec::with_capacity(list.len() + 1);
    result.extend_from_slice(&list[..index]);
    result.push(value);
    result.extend_from_slice(&list[index..]);
    result
}

/// Return a copy of `list` without the element at `index`.
///
/// # Panics
///
/// Panics if `index >= list.len()`.
pub fn remove_at<T: Clone>(list: &[T], index: usize) -> Vec<T> {
    assert!(
        index < list.len(),
        "remove_at: index {} out of range for length {}",
        index,
        list.len()
    );

    let mut result = list.to_vec();
    result.remove(index);
    result
}

/// Move the element at `index` one step up or down.
///
/// # Panics
///
/// Panics if the move would leave the list bounds.
pub fn swap_adjacent<T: Clone>(list: &[T], index: usize, direction: Direction) -> Vec<T> {
    let to = match direction {
        Direction::Up => index
            .checked_sub(1)
            .unwrap_or_else(|| panic!("swap_adjacent: cannot move index 0 up")),
        Direction::Down => index + 1,
    };
    move_item(list, index, to)
}
