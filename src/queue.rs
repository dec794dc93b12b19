//! A minimal singly linked FIFO queue.
//!
//! [`SimpleQueue`] owns a chain of heap nodes and keeps pointers to both ends,
//! so appending and popping the front are constant time.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

type Link<T> = Option<NonNull<Node<T>>>;

struct Node<T> {
  value: T,
  next: Link<T>,
}

/// An ordered container with O(1) append, pop-front and length.
pub struct SimpleQueue<T> {
  // Every node comes from `Box::leak` and is owned by the queue until
  // `dequeue` or `clear` turns it back into a `Box`. No `Box` is alive while
  // a node is linked, so `head`, `tail` and `next` may alias freely.
  head: Link<T>,
  // `None` iff `head` is `None`; otherwise the last node, whose `next` is `None`.
  tail: Link<T>,
  len: usize,
  _owns: PhantomData<Box<Node<T>>>,
}

// SAFETY: the queue uniquely owns every node it links, exactly like a chain of
// `Box`es would.
unsafe impl<T: Send> Send for SimpleQueue<T> {}
unsafe impl<T: Sync> Sync for SimpleQueue<T> {}

impl<T> SimpleQueue<T> {
  /// Creates an empty queue.
  pub const fn new() -> Self {
    Self {
      head: None,
      tail: None,
      len: 0,
      _owns: PhantomData,
    }
  }

  /// Returns the number of elements in the queue.
  pub fn len(&self) -> usize {
    self.len
  }

  /// Returns `true` if the queue holds no elements.
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Appends `value` at the back of the queue.
  pub fn enqueue(&mut self, value: T) {
    let node = NonNull::from(Box::leak(Box::new(Node { value, next: None })));

    match self.tail {
      // SAFETY: `tail` is a live node owned by this queue, and `&mut self`
      // guarantees no reference into the chain is outstanding.
      Some(tail) => unsafe { (*tail.as_ptr()).next = Some(node) },
      None => self.head = Some(node),
    }

    self.tail = Some(node);
    self.len += 1;
  }

  /// Removes and returns the front element, or `None` if the queue is empty.
  pub fn dequeue(&mut self) -> Option<T> {
    self.head.map(|head| {
      // SAFETY: `head` came from `Box::leak` in `enqueue` and is unlinked
      // below, so ownership returns to this `Box` exactly once.
      let node = unsafe { Box::from_raw(head.as_ptr()) };
      self.head = node.next;
      if self.head.is_none() {
        self.tail = None;
      }
      self.len -= 1;
      node.value
    })
  }

  /// Discards every element and resets the queue to empty.
  pub fn clear(&mut self) {
    let chain = self.head.take();
    self.tail = None;
    self.len = 0;
    // SAFETY: the chain has just been detached from the queue.
    unsafe { drop_chain(chain) };
  }

  /// Returns a front-to-back iterator over the queued elements.
  pub fn iter(&self) -> Iter<'_, T> {
    Iter {
      next: self.head,
      remaining: self.len,
      _queue: PhantomData,
    }
  }
}

// Frees nodes one at a time so a long chain does not recurse.
//
// SAFETY: `cursor` must be the head of a chain of nodes created by `enqueue`
// that nothing else links to any more.
unsafe fn drop_chain<T>(mut cursor: Link<T>) {
  while let Some(node) = cursor {
    let node = unsafe { Box::from_raw(node.as_ptr()) };
    cursor = node.next;
  }
}

impl<T> Drop for SimpleQueue<T> {
  fn drop(&mut self) {
    self.clear();
  }
}

impl<T> Default for SimpleQueue<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: fmt::Debug> fmt::Debug for SimpleQueue<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.iter()).finish()
  }
}

impl<T> Extend<T> for SimpleQueue<T> {
  fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
    for value in iter {
      self.enqueue(value);
    }
  }
}

impl<T> FromIterator<T> for SimpleQueue<T> {
  fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
    let mut queue = Self::new();
    queue.extend(iter);
    queue
  }
}

/// Borrowing iterator returned by [`SimpleQueue::iter`].
pub struct Iter<'a, T> {
  next: Link<T>,
  remaining: usize,
  _queue: PhantomData<&'a SimpleQueue<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
  type Item = &'a T;

  fn next(&mut self) -> Option<Self::Item> {
    self.next.map(|node| {
      // SAFETY: the iterator borrows the queue for `'a`, so every linked node
      // stays alive and unmodified while the returned reference exists.
      let node = unsafe { &*node.as_ptr() };
      self.next = node.next;
      self.remaining -= 1;
      &node.value
    })
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a SimpleQueue<T> {
  type Item = &'a T;
  type IntoIter = Iter<'a, T>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

/// Draining iterator that yields the queue's elements front to back.
pub struct IntoIter<T>(SimpleQueue<T>);

impl<T> Iterator for IntoIter<T> {
  type Item = T;

  fn next(&mut self) -> Option<T> {
    self.0.dequeue()
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.0.len(), Some(self.0.len()))
  }
}

impl<T> ExactSizeIterator for IntoIter<T> {}
impl<T> FusedIterator for IntoIter<T> {}

impl<T> IntoIterator for SimpleQueue<T> {
  type Item = T;
  type IntoIter = IntoIter<T>;

  fn into_iter(self) -> Self::IntoIter {
    IntoIter(self)
  }
}
