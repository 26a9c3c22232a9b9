use crate::error::{Result, StylescopeError};
use crate::model::PathId;
use lasso::{Key, Rodeo, Spur};

/// Bidirectional path string <-> [`PathId`] table.
///
/// Ids are handed out in first-seen order and never reused while the
/// interner lives; only [`PathInterner::reset`] invalidates them.
#[derive(Debug, Default)]
pub struct PathInterner {
    rodeo: Rodeo,
}

impl PathInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, path: &str) -> PathId {
        PathId(self.rodeo.get_or_intern(path).into_usize() as u32)
    }

    /// Id of an already interned path, without interning it.
    pub fn get(&self, path: &str) -> Option<PathId> {
        self.rodeo
            .get(path)
            .map(|spur| PathId(spur.into_usize() as u32))
    }

    /// Original string of an id. An id this interner never issued is an
    /// invariant violation: it asserts in debug builds and yields `None` otherwise.
    pub fn resolve(&self, id: PathId) -> Option<&str> {
        let resolved = Spur::try_from_usize(id.index()).and_then(|spur| self.rodeo.try_resolve(&spur));
        debug_assert!(resolved.is_some(), "path id {id} has no interned path");
        if resolved.is_none() {
            tracing::error!("Lookup of unknown path id {}", id);
        }
        resolved
    }

    pub fn reset(&mut self) {
        self.rodeo = Rodeo::new();
    }

    /// Replace the contents so that `id == position in paths`.
    /// Duplicate entries would break that mapping and are rejected,
    /// leaving the current contents untouched.
    pub fn load_ordered<I, S>(&mut self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rodeo: Rodeo<Spur> = Rodeo::new();
        for (position, path) in paths.into_iter().enumerate() {
            let spur = rodeo.get_or_intern(path.as_ref());
            if spur.into_usize() != position {
                return Err(StylescopeError::Parsing(format!(
                    "duplicate path '{}' at position {}",
                    path.as_ref(),
                    position
                )));
            }
        }
        self.rodeo = rodeo;
        Ok(())
    }

    /// Interned paths in id order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.rodeo.strings()
    }

    pub fn contains_id(&self, id: PathId) -> bool {
        id.index() < self.rodeo.len()
    }

    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}
