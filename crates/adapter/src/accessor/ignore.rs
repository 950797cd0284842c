use std::rc::Rc;

use super::Accessor;

thread_local! {
    static IGNORE: Rc<Accessor> = Rc::new(Accessor::Ignore);
}

/// The ignore accessor shared by every ignored property on this thread.
pub(super) fn instance() -> Rc<Accessor> {
    IGNORE.with(Rc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::PropertyAccessor;

    #[test]
    fn test_single_instance() {
        let a = instance();
        let b = Accessor::ignore();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(a.is_ignored());
        assert!(a.is_prepared());
        assert_eq!(a.property_name(), "");
    }
}
