use std::fmt;
use std::rc::Rc;

/// A persistent stack: pushing never disturbs other handles to the same
/// list, and clones share their tails.
pub struct SharedList<T> {
    head: Link<T>,
    len: usize,
}

type Link<T> = Option<Rc<Node<T>>>;

struct Node<T> {
    elem: T,
    next: Link<T>,
}

impl<T> Clone for SharedList<T> {
    fn clone(&self) -> SharedList<T> {
        SharedList {
            head: self.head.clone(),
            len: self.len,
        }
    }
}

impl<T> Default for SharedList<T> {
    fn default() -> Self {
        SharedList::new()
    }
}

impl<T> SharedList<T> {
    pub fn new() -> Self {
        SharedList { head: None, len: 0 }
    }

    pub fn push(&mut self, elem: T) {
        let next = self.head.take();
        self.head = Some(Rc::new(Node { elem, next }));
        self.len += 1;
    }

    /// A new list with `elem` on top of this one.
    pub fn pushed(&self, elem: T) -> SharedList<T> {
        let mut list = self.clone();
        list.push(elem);
        list
    }

    pub fn peek(&self) -> Option<&T> {
        self.head.as_ref().map(|node| &node.elem)
    }

    pub fn tail(&self) -> SharedList<T> {
        SharedList {
            head: self.head.as_ref().and_then(|node| node.next.clone()),
            len: self.len.saturating_sub(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// From the most recently pushed element down.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    pub fn equals(&self, other: &SharedList<T>) -> bool {
        match (&self.head, &other.head) {
            (None, None) => true,
            (Some(l), Some(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }
}

pub struct Iter<'a, T> {
    next: Option<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.next.map(|node| {
            self.next = node.next.as_deref();
            &node.elem
        })
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Drop for SharedList<T> {
    // Unlink uniquely owned nodes one at a time so deep stacks don't recurse.
    fn drop(&mut self) {
        let mut link = self.head.take();
        while let Some(node) = link {
            match Rc::try_unwrap(node) {
                Ok(mut node) => link = node.next.take(),
                Err(_) => break,
            }
        }
    }
}
