//! Grammar memoization keyed by command-name set.

use super::Grammar;
use crate::error::FrontendError;
use std::collections::BTreeSet;
use std::rc::Rc;
use tracing::debug;

/// Holds the grammar for the most recent command-name set.
///
/// The set is order-independent, so the same names arriving in a different
/// order reuse the cached grammar.
#[derive(Debug, Default)]
pub struct GrammarCache {
    current: Option<Rc<Grammar>>,
    compiles: usize,
}

impl GrammarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grammar for `names`, compiling only when the set changed
    pub fn get(&mut self, names: &BTreeSet<String>) -> Result<Rc<Grammar>, FrontendError> {
        if let Some(grammar) = &self.current
            && grammar.names() == names
        {
            debug!("grammar cache hit");
            return Ok(Rc::clone(grammar));
        }

        let grammar = Rc::new(Grammar::compile(names)?);
        self.compiles += 1;
        self.current = Some(Rc::clone(&grammar));
        Ok(grammar)
    }

    /// How many times a grammar was compiled
    pub fn compiles(&self) -> usize {
        self.compiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands;

    #[test]
    fn test_same_set_reuses_grammar() -> Result<(), String> {
        let mut cache = GrammarCache::new();
        let names = commands::builtin_names();
        let a = cache.get(&names).map_err(|e| e.to_string())?;
        let b = cache.get(&names).map_err(|e| e.to_string())?;
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.compiles(), 1);
        Ok(())
    }

    #[test]
    fn test_insertion_order_does_not_matter() -> Result<(), String> {
        let mut cache = GrammarCache::new();
        let first: BTreeSet<String> = ["next", "step", "zz"].iter().map(|s| s.to_string()).collect();
        let second: BTreeSet<String> = ["zz", "step", "next"].iter().map(|s| s.to_string()).collect();
        cache.get(&first).map_err(|e| e.to_string())?;
        cache.get(&second).map_err(|e| e.to_string())?;
        assert_eq!(cache.compiles(), 1);
        Ok(())
    }

    #[test]
    fn test_new_alias_recompiles() -> Result<(), String> {
        let mut cache = GrammarCache::new();
        let mut names = commands::builtin_names();
        cache.get(&names).map_err(|e| e.to_string())?;
        names.insert("nn".to_string());
        let grammar = cache.get(&names).map_err(|e| e.to_string())?;
        assert_eq!(cache.compiles(), 2);
        assert!(grammar.names().contains("nn"));
        Ok(())
    }
}
