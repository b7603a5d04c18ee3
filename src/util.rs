pub mod idx;
#[cfg(test)]
pub(crate) mod test_utils;

pub trait UpToExt: Iterator + Sized {
    /// Yields items until (and including) the first one that satisfies
    /// `stop_predicate`. Useful for iterators that never end on their own,
    /// such as the lexer, which keeps producing end-of-file tokens.
    fn up_to<P>(self, stop_predicate: P) -> UpTo<Self, P>
    where
        P: FnMut(&Self::Item) -> bool;
}

impl<I> UpToExt for I
where
    I: Iterator,
{
    fn up_to<P>(self, stop_predicate: P) -> UpTo<Self, P>
    where
        P: FnMut(&Self::Item) -> bool,
    {
        UpTo {
            iter: self,
            stop_predicate,
            finished: false,
        }
    }
}

pub struct UpTo<I, P> {
    iter: I,
    stop_predicate: P,
    finished: bool,
}

impl<I, P> Iterator for UpTo<I, P>
where
    I: Iterator,
    P: FnMut(&I::Item) -> bool,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let next = self.iter.next()?;
        self.finished = (self.stop_predicate)(&next);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use crate::util::UpToExt;

    #[test]
    fn test_up_to() {
        let items: Vec<_> = (0..10).up_to(|x| *x == 5).collect();
        assert_eq!(items, [0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_up_to_infinite() {
        let items: Vec<_> = std::iter::repeat(7).up_to(|_| true).collect();
        assert_eq!(items, [7]);
    }
}
