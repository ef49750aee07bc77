//! Ordered fallback chains for field extraction.
//!
//! Most fields on the scraped sites can be found in several places
//! depending on the page template. A [`Cascade`] lists those places as
//! named strategies, in priority order, and stops at the first one that
//! produces a value.
//!
//! ```
//! use rc_scrape_scraper::Cascade;
//!
//! let name = Cascade::new("name")
//!     .then("heading", |s: &&str| s.strip_prefix("# ").map(str::to_owned))
//!     .then("raw", |s: &&str| Some((*s).to_owned()));
//!
//! assert_eq!(name.resolve(&"# Title").as_deref(), Some("Title"));
//! assert_eq!(name.resolve(&"Title").as_deref(), Some("Title"));
//! ```

type StrategyFn<'a, C, T> = Box<dyn Fn(&C) -> Option<T> + 'a>;

/// A named, ordered list of extraction strategies over a context `C`.
pub struct Cascade<'a, C: ?Sized, T> {
    field: &'static str,
    strategies: Vec<(&'static str, StrategyFn<'a, C, T>)>,
}

impl<'a, C: ?Sized, T> Cascade<'a, C, T> {
    /// Creates an empty cascade for the field called `field`.
    #[must_use]
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    /// Appends a strategy with the lowest priority so far.
    #[must_use]
    pub fn then(mut self, name: &'static str, strategy: impl Fn(&C) -> Option<T> + 'a) -> Self {
        self.strategies.push((name, Box::new(strategy)));
        self
    }

    /// Runs the strategies in order and returns the first value produced.
    pub fn resolve(&self, ctx: &C) -> Option<T> {
        self.resolve_named(ctx).map(|(_, value)| value)
    }

    /// Like [`Self::resolve`] but also reports which strategy won.
    pub fn resolve_named(&self, ctx: &C) -> Option<(&'static str, T)> {
        for (name, strategy) in &self.strategies {
            if let Some(value) = strategy(ctx) {
                log::trace!("{}: resolved by '{name}'", self.field);
                return Some((*name, value));
            }
        }
        log::trace!("{}: no strategy matched", self.field);
        None
    }

    /// Strategy names in priority order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|(name, _)| *name).collect()
    }
}

impl<C: ?Sized, T: Default> Cascade<'_, C, T> {
    /// Resolves the field, falling back to `T::default()`.
    pub fn resolve_or_default(&self, ctx: &C) -> T {
        self.resolve(ctx).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn first_success_short_circuits() {
        let later_calls = Cell::new(0);
        let cascade = Cascade::new("n")
            .then("none", |_: &u32| None)
            .then("double", |v: &u32| Some(v * 2))
            .then("never", |_: &u32| {
                later_calls.set(later_calls.get() + 1);
                Some(0)
            });

        assert_eq!(cascade.resolve_named(&4), Some(("double", 8)));
        assert_eq!(later_calls.get(), 0);
    }

    #[test]
    fn falls_back_to_default_when_nothing_matches() {
        let cascade: Cascade<'_, str, String> = Cascade::new("n").then("none", |_| None);
        assert_eq!(cascade.resolve_or_default("x"), "");
    }

    #[test]
    fn names_are_in_priority_order() {
        let cascade: Cascade<'_, u8, u8> = Cascade::new("n")
            .then("a", |_| None)
            .then("b", |_| None);
        assert_eq!(cascade.names(), ["a", "b"]);
    }
}
