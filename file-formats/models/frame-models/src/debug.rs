//! Debug formatting that keeps large vertex and triangle tables readable

use std::fmt;

const PREVIEW_ELEMENTS: usize = 3;

/// Collections whose debug output can be shortened to a preview
pub trait Preview {
    type Item: fmt::Debug;

    fn total(&self) -> usize;
    fn head(&self, count: usize) -> &[Self::Item];
}

impl<T: fmt::Debug> Preview for Vec<T> {
    type Item = T;

    fn total(&self) -> usize {
        self.len()
    }

    fn head(&self, count: usize) -> &[T] {
        &self[..count.min(self.len())]
    }
}

/// Print the first few elements followed by the number left out
#[cfg(not(feature = "debug-print-all"))]
pub fn trimmed_collection_fmt<C: Preview + fmt::Debug>(
    items: &C,
    f: &mut fmt::Formatter,
) -> fmt::Result {
    let head = items.head(PREVIEW_ELEMENTS);
    let rest = items.total() - head.len();

    if rest == 0 {
        write!(f, "{:#?}", head)
    } else {
        write!(f, "{:#?} + {} elements", head, rest)
    }
}

#[cfg(feature = "debug-print-all")]
pub fn trimmed_collection_fmt<C: Preview + fmt::Debug>(
    items: &C,
    f: &mut fmt::Formatter,
) -> fmt::Result {
    write!(f, "{:#?}", items)
}
