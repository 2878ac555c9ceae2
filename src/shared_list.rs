//! An ordered, mutable list whose sub-ranges can be taken as live views.
//!
//! A view does not copy anything. It stores absolute bounds into the backing
//! list and reads and writes through it. Every length-changing mutation,
//! whether made through the root handle or through any view, walks the
//! registry of live views and moves their bounds so they keep denoting the
//! same logical elements.

use core::{
    cell::{Cell, Ref, RefCell, RefMut},
    fmt,
    ops::{Bound, Range, RangeBounds},
};
use std::rc::Rc;

/// The registered bounds of one live view.
#[derive(Debug)]
struct Bounds {
    /// The absolute index of the first element of the view.
    start: Cell<usize>,
    /// The absolute index after the last element of the view.
    stop: Cell<usize>,
    /// False once the owning handle has been dropped.
    live: Cell<bool>,
}

impl Bounds {
    /// The current absolute range of the view.
    #[inline]
    fn range(&self) -> Range<usize> {
        self.start.get()..self.stop.get()
    }
}

/// The storage shared by a list and all of its views.
struct Backing<T> {
    /// The elements.
    items: Vec<T>,
    /// Every view which has not yet been unregistered.
    views: Vec<Rc<Bounds>>,
}

/// A list handle. It is either the root of a backing list or a live view
/// over a contiguous range of it.
pub struct SharedList<T> {
    /// The backing storage.
    inner: Rc<RefCell<Backing<T>>>,
    /// The view bounds, or `None` for a handle which sees the whole list.
    bounds: Option<Rc<Bounds>>,
}

impl<T> SharedList<T> {
    /// Creates a new empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Creates a new list which owns the given items.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Backing {
                items,
                views: Vec::new(),
            })),
            bounds: None,
        }
    }

    /// The absolute range of the backing list visible through this handle.
    fn range_in(&self, backing: &Backing<T>) -> Range<usize> {
        match &self.bounds {
            Some(bounds) => bounds.range(),
            None => 0..backing.items.len(),
        }
    }

    /// The absolute range of the backing list visible through this handle.
    fn absolute(&self) -> Range<usize> {
        self.range_in(&self.inner.borrow())
    }

    /// The number of visible elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.absolute().len()
    }

    /// Returns true if there are no visible elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if this handle is a view rather than a root handle.
    #[must_use]
    pub fn is_view(&self) -> bool {
        self.bounds.is_some()
    }

    /// Returns true if both handles read from the same backing list,
    /// regardless of the ranges they see.
    #[must_use]
    pub fn same_backing(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns true if both handles see the same range of the same backing
    /// list.
    #[must_use]
    pub fn same_range(&self, other: &Self) -> bool {
        self.same_backing(other) && self.absolute() == other.absolute()
    }

    /// Creates a live view over `range`, relative to this handle.
    ///
    /// Out-of-range bounds are clamped, the same way slicing a list in a
    /// dynamic language would be.
    #[must_use]
    pub fn view(&self, range: impl RangeBounds<usize>) -> Self {
        let mut backing = self.inner.borrow_mut();
        let visible = self.range_in(&backing);
        let relative = to_range(range, visible.len());
        let start = visible.start + relative.start;
        let stop = (visible.start + relative.end).max(start);
        self.register(&mut backing, start..stop)
    }

    /// Creates a live view over every `step`th element of `range`, relative to
    /// this handle, starting with the first.
    ///
    /// # Panics
    ///
    /// If `step` is zero.
    #[must_use]
    pub fn view_step(&self, range: impl RangeBounds<usize>, step: usize) -> StepView<T> {
        assert!(step != 0, "view step must be non-zero");
        StepView {
            span: self.view(range),
            step,
        }
    }

    /// Creates another handle which sees exactly what this handle sees.
    ///
    /// Sharing a root handle yields another root handle. Sharing a view
    /// yields a new view with the same bounds, which is then adjusted
    /// independently.
    #[must_use]
    pub fn share(&self) -> Self {
        match &self.bounds {
            None => Self {
                inner: Rc::clone(&self.inner),
                bounds: None,
            },
            Some(bounds) => {
                let mut backing = self.inner.borrow_mut();
                self.register(&mut backing, bounds.range())
            }
        }
    }

    /// Registers a new view with the given absolute range.
    fn register(&self, backing: &mut Backing<T>, range: Range<usize>) -> Self {
        let bounds = Rc::new(Bounds {
            start: Cell::new(range.start),
            stop: Cell::new(range.end),
            live: Cell::new(true),
        });
        backing.views.retain(|view| view.live.get());
        backing.views.push(Rc::clone(&bounds));
        Self {
            inner: Rc::clone(&self.inner),
            bounds: Some(bounds),
        }
    }

    /// Borrows the visible elements.
    ///
    /// # Panics
    ///
    /// If the backing list is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, [T]> {
        Ref::map(self.inner.borrow(), |backing| {
            &backing.items[self.range_in(backing)]
        })
    }

    /// Mutably borrows the visible elements. The length of the list cannot be
    /// changed this way.
    ///
    /// # Panics
    ///
    /// If the backing list is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, [T]> {
        RefMut::map(self.inner.borrow_mut(), |backing| {
            let range = self.range_in(backing);
            &mut backing.items[range]
        })
    }

    /// Inserts `item` at `index`, shifting everything after it. An index past
    /// the end appends.
    pub fn insert(&self, index: usize, item: T) {
        self.splice(index..index, [item]);
    }

    /// Appends `item` to the end of the visible range.
    pub fn push(&self, item: T) {
        let len = self.len();
        self.splice(len..len, [item]);
    }

    /// Appends all items to the end of the visible range.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        let len = self.len();
        self.splice(len..len, items);
    }

    /// Removes and returns the element at `index`.
    ///
    /// # Panics
    ///
    /// If `index >= len`.
    pub fn remove(&self, index: usize) -> T {
        let len = self.len();
        assert!(index < len, "removal index {index} out of range for {len}");
        let mut removed = self.splice(index..=index, []);
        removed.remove(0)
    }

    /// Removes and returns the last visible element, if any.
    pub fn pop(&self) -> Option<T> {
        let len = self.len();
        (len != 0).then(|| self.remove(len - 1))
    }

    /// Removes every visible element.
    pub fn clear(&self) {
        self.splice(.., []);
    }

    /// Replaces the visible elements in `range` with `items`, returning the
    /// removed elements. A range which runs past the end is clamped to it.
    ///
    /// # Panics
    ///
    /// If the range starts after it ends.
    pub fn splice(
        &self,
        range: impl RangeBounds<usize>,
        items: impl IntoIterator<Item = T>,
    ) -> Vec<T> {
        let items = items.into_iter().collect::<Vec<_>>();
        let mut backing = self.inner.borrow_mut();
        let visible = self.range_in(&backing);
        let relative = to_range(range, visible.len());
        assert!(
            relative.start <= relative.end && relative.end <= visible.len(),
            "splice range {relative:?} out of range for {}",
            visible.len()
        );
        let at = (visible.start + relative.start)..(visible.start + relative.end);

        // The range a view must contain for a bound sitting exactly at the
        // mutation point to absorb inserted items. `None` for the root.
        let initiator = self.bounds.as_ref().map(|bounds| bounds.range());

        let inserted = items.len();
        let removed = backing.items.splice(at.clone(), items).collect::<Vec<_>>();

        backing.views.retain(|view| view.live.get());
        for view in &backing.views {
            if let Some(own) = &self.bounds
                && Rc::ptr_eq(own, view)
            {
                view.stop.set(view.stop.get() - removed.len() + inserted);
            } else {
                adjust(view, &at, inserted, initiator.as_ref());
            }
        }

        removed
    }
}

impl<T: Clone> SharedList<T> {
    /// Returns a clone of the element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.borrow().get(index).cloned()
    }

    /// Replaces the element at `index`, returning the old one.
    ///
    /// # Panics
    ///
    /// If `index >= len`.
    pub fn set(&self, index: usize, item: T) -> T {
        core::mem::replace(&mut self.borrow_mut()[index], item)
    }

    /// Returns a clone of the visible elements.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.borrow().to_vec()
    }
}

/// A live view over every `step`th element of a range of a [`SharedList`].
///
/// The range itself is an ordinary view, so it moves and resizes with
/// mutations the same way. The selected elements are always the ones at
/// multiples of `step` from the current start of the range.
pub struct StepView<T> {
    /// The whole range the stepped elements are taken from.
    span: SharedList<T>,
    /// The distance between selected elements.
    step: usize,
}

impl<T> StepView<T> {
    /// The distance between selected elements.
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    /// The number of selected elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.span.len().div_ceil(self.step)
    }

    /// Returns true if no elements are selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns the selected element at `index`. Elements after
    /// it shift, so the selection is recomputed from the start of the range.
    ///
    /// # Panics
    ///
    /// If `index >= len`.
    pub fn remove(&self, index: usize) -> T {
        let len = self.len();
        assert!(index < len, "removal index {index} out of range for {len}");
        self.span.remove(index * self.step)
    }

    /// Removes every selected element, leaving the ones in between.
    pub fn clear(&self) {
        let selected = (0..self.span.len()).step_by(self.step).collect::<Vec<_>>();
        for index in selected.into_iter().rev() {
            self.span.remove(index);
        }
    }
}

impl<T: Clone> StepView<T> {
    /// Returns a clone of the selected element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        if index < self.len() {
            self.span.get(index * self.step)
        } else {
            None
        }
    }

    /// Replaces the selected element at `index`, returning the old one.
    ///
    /// # Panics
    ///
    /// If `index >= len`.
    pub fn set(&self, index: usize, item: T) -> T {
        let len = self.len();
        assert!(index < len, "index {index} out of range for {len}");
        self.span.set(index * self.step, item)
    }

    /// Returns a clone of the selected elements.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.span.borrow().iter().step_by(self.step).cloned().collect()
    }
}

impl<T: fmt::Debug> fmt::Debug for StepView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.span.borrow().iter().step_by(self.step))
            .finish()
    }
}

/// Moves the bounds of a view which did not initiate a mutation.
///
/// `at` is the absolute range which was removed, `inserted` the number of
/// items which replaced it, and `initiator` the pre-mutation range of the
/// view the mutation went through, or `None` for the root handle.
fn adjust(view: &Bounds, at: &Range<usize>, inserted: usize, initiator: Option<&Range<usize>>) {
    let (start, stop) = (view.start.get(), view.stop.get());
    let contains = match initiator {
        None => start <= at.start && at.start <= stop,
        // An empty view sits between its neighbours, not inside them.
        Some(initiator) if initiator.is_empty() => start == initiator.start && stop == initiator.end,
        Some(initiator) => start <= initiator.start && initiator.end <= stop,
    };

    let removed = at.len();
    let collapse = |bound: usize| {
        if bound <= at.start {
            bound
        } else if bound >= at.end {
            bound - removed
        } else {
            at.start
        }
    };
    let (mut start, mut stop) = (collapse(start), collapse(stop));

    if start > at.start || (start == at.start && !contains) {
        start += inserted;
    }
    if stop > at.start || (stop == at.start && contains) {
        stop += inserted;
    }

    view.start.set(start);
    view.stop.set(stop.max(start));
}

/// Converts any range into a concrete range over a sequence of length `len`,
/// clamping the end.
fn to_range(range: impl RangeBounds<usize>, len: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(start) => *start,
        Bound::Excluded(start) => start + 1,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(end) => end + 1,
        Bound::Excluded(end) => *end,
        Bound::Unbounded => len,
    };
    start.min(len)..end.min(len)
}

impl<T> Default for SharedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SharedList<T> {
    fn drop(&mut self) {
        if let Some(bounds) = self.bounds.take() {
            bounds.live.set(false);
            // If the backing list is busy, the dead entry is pruned by the
            // next mutation instead.
            if let Ok(mut backing) = self.inner.try_borrow_mut() {
                backing.views.retain(|view| !Rc::ptr_eq(view, &bounds));
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.borrow().iter()).finish()
    }
}

impl<T> From<Vec<T>> for SharedList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[u32]) -> SharedList<u32> {
        SharedList::from_vec(items.to_vec())
    }

    #[test]
    fn view_reads_through_parent() {
        let parent = list(&[0, 1, 2, 3, 4, 5]);
        let child = parent.view(2..5);
        assert_eq!(child.to_vec(), [2, 3, 4]);
        parent.set(3, 30);
        assert_eq!(child.to_vec(), [2, 30, 4]);
        child.set(0, 20);
        assert_eq!(parent.to_vec(), [0, 1, 20, 30, 4, 5]);
    }

    #[test]
    fn append_through_view_lands_after_its_last_element() {
        let parent = list(&[0, 1, 2, 3, 4, 5]);
        let child = parent.view(1..3);
        child.push(99);
        assert_eq!(parent.to_vec(), [0, 1, 2, 99, 3, 4, 5]);
        assert_eq!(child.to_vec(), [1, 2, 99]);
    }

    #[test]
    fn insert_before_view_pushes_it() {
        let parent = list(&[0, 1, 2, 3, 4]);
        let child = parent.view(2..4);
        parent.insert(0, 7);
        assert_eq!(child.to_vec(), [2, 3]);
        parent.insert(6, 8);
        assert_eq!(child.to_vec(), [2, 3]);
        assert_eq!(parent.to_vec(), [7, 0, 1, 2, 3, 4, 8]);
    }

    #[test]
    fn delete_inside_view_shrinks_it() {
        let parent = list(&[0, 1, 2, 3, 4, 5, 6]);
        let child = parent.view(1..6);
        let after = parent.view(6..);
        parent.splice(2..4, []);
        assert_eq!(child.to_vec(), [1, 4, 5]);
        assert_eq!(child.len(), 3);
        assert_eq!(after.to_vec(), [6]);
    }

    #[test]
    fn delete_overlapping_view_start() {
        let parent = list(&[0, 1, 2, 3, 4, 5]);
        let child = parent.view(2..5);
        parent.splice(1..3, []);
        assert_eq!(child.to_vec(), [3, 4]);
    }

    #[test]
    fn adjacent_views_stay_disjoint() {
        let parent = list(&[0, 1, 2, 3]);
        let first = parent.view(0..2);
        let second = parent.view(2..4);
        first.push(9);
        assert_eq!(first.to_vec(), [0, 1, 9]);
        assert_eq!(second.to_vec(), [2, 3]);
        second.insert(0, 8);
        assert_eq!(first.to_vec(), [0, 1, 9]);
        assert_eq!(second.to_vec(), [8, 2, 3]);
        assert_eq!(parent.to_vec(), [0, 1, 9, 8, 2, 3]);
    }

    #[test]
    fn nested_views_grow_together() {
        let parent = list(&[0, 1, 2, 3, 4]);
        let outer = parent.view(1..5);
        let inner = outer.view(2..4);
        assert_eq!(inner.to_vec(), [3, 4]);
        inner.push(5);
        assert_eq!(outer.to_vec(), [1, 2, 3, 4, 5]);
        assert_eq!(parent.len(), 6);
        inner.remove(0);
        assert_eq!(outer.to_vec(), [1, 2, 4, 5]);
        assert_eq!(inner.to_vec(), [4, 5]);
    }

    #[test]
    fn dropped_views_are_unregistered() {
        let parent = list(&[0, 1, 2]);
        let child = parent.view(0..1);
        drop(parent.view(1..2));
        assert_eq!(parent.inner.borrow().views.len(), 1);
        drop(child);
        assert!(parent.inner.borrow().views.is_empty());
    }

    #[test]
    fn view_outlives_root_handle() {
        let parent = list(&[0, 1, 2]);
        let child = parent.view(1..);
        drop(parent);
        child.push(3);
        assert_eq!(child.to_vec(), [1, 2, 3]);
    }

    #[test]
    fn share_keeps_identity() {
        let parent = list(&[0, 1, 2, 3]);
        let child = parent.view(1..3);
        let twin = child.share();
        assert!(twin.same_range(&child));
        twin.push(7);
        assert_eq!(child.to_vec(), [1, 2, 7]);
        assert!(parent.share().same_range(&parent));
    }

    #[test]
    fn clamps_out_of_range_views() {
        let parent = list(&[0, 1]);
        assert!(parent.view(5..9).is_empty());
        assert_eq!(parent.view(1..9).to_vec(), [1]);
    }

    #[test]
    fn clear_through_view() {
        let parent = list(&[0, 1, 2, 3]);
        let child = parent.view(1..3);
        let tail = parent.view(3..);
        child.clear();
        assert_eq!(parent.to_vec(), [0, 3]);
        assert!(child.is_empty());
        assert_eq!(tail.to_vec(), [3]);
        child.push(5);
        assert_eq!(parent.to_vec(), [0, 5, 3]);
        assert_eq!(tail.to_vec(), [3]);
    }

    #[test]
    fn stepped_view_reads_and_writes() {
        let parent = list(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let odd = parent.view_step(1..7, 2);
        assert_eq!(odd.to_vec(), [1, 3, 5]);
        assert_eq!(odd.len(), 3);
        assert_eq!(odd.get(2), Some(5));
        assert_eq!(odd.get(3), None);

        assert_eq!(odd.set(1, 30), 3);
        assert_eq!(parent.to_vec(), [0, 1, 2, 30, 4, 5, 6, 7]);
        parent.set(5, 50);
        assert_eq!(odd.to_vec(), [1, 30, 50]);
        assert_eq!(format!("{odd:?}"), "[1, 30, 50]");
    }

    #[test]
    fn stepped_view_follows_mutations() {
        let parent = list(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let odd = parent.view_step(1..7, 2);
        parent.insert(0, 9);
        assert_eq!(odd.to_vec(), [1, 3, 5]);

        assert_eq!(odd.remove(0), 1);
        assert_eq!(parent.to_vec(), [9, 0, 2, 3, 4, 5, 6, 7]);
        assert_eq!(odd.to_vec(), [2, 4, 6]);

        odd.clear();
        assert_eq!(parent.to_vec(), [9, 0, 3, 5, 7]);
        assert_eq!(odd.to_vec(), [3]);
        assert_eq!(odd.step(), 2);
    }

    #[test]
    fn stepped_view_of_a_view() {
        let parent = list(&[0, 1, 2, 3, 4, 5, 6]);
        let child = parent.view(1..);
        let every_third = child.view_step(.., 3);
        assert_eq!(every_third.to_vec(), [1, 4]);
        child.push(7);
        assert_eq!(every_third.to_vec(), [1, 4, 7]);
        parent.splice(0..2, []);
        assert_eq!(every_third.to_vec(), [2, 5]);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn zero_step_panics() {
        let _ = list(&[0]).view_step(.., 0);
    }
}
