//! # Qualifiers: composable predicates over component descriptors.
//!
//! A [`Qualifier`] narrows a lazy stream of candidate
//! [`ComponentDescriptor`]s. Qualifiers compose through
//! [`CompositeQualifier`], which applies its constituents in sequence, each
//! stage consuming the previous stage's output:
//!
//! ```text
//!  candidates ──▶ [ q1.filter ] ──▶ [ q2.filter ] ──▶ ... ──▶ selected
//! ```
//!
//! Composition is a set intersection: constituent order never changes the
//! result, only how early candidates are discarded. Two composites with equal
//! constituents compare equal and render as the constituents joined with
//! `" and "`.

use std::fmt;
use std::marker::PhantomData;

use crate::components::ComponentDescriptor;

/// Lazy stream of candidate descriptors flowing through a filter stage.
pub type Candidates<'a, T> = Box<dyn Iterator<Item = ComponentDescriptor<T>> + 'a>;

/// A composable predicate over component descriptors.
///
/// `Display` is part of the contract: the textual form is used for composite
/// equality and for error messages when a lookup matches nothing.
pub trait Qualifier<T: 'static>: fmt::Display + Send + Sync {
    /// Narrows the candidate stream. The output must be a subset of the input.
    fn filter<'a>(&'a self, candidates: Candidates<'a, T>) -> Candidates<'a, T>;
}

/// Logical AND of an ordered list of qualifiers.
pub struct CompositeQualifier<T: 'static> {
    qualifiers: Vec<Box<dyn Qualifier<T>>>,
}

impl<T: 'static> CompositeQualifier<T> {
    /// Creates an empty composite; it matches every candidate.
    pub fn new() -> Self {
        Self { qualifiers: Vec::new() }
    }

    /// Appends a constituent qualifier.
    pub fn and(mut self, qualifier: impl Qualifier<T> + 'static) -> Self {
        self.qualifiers.push(Box::new(qualifier));
        self
    }

    /// Number of constituent qualifiers.
    pub fn len(&self) -> usize {
        self.qualifiers.len()
    }

    /// Whether the composite has no constituents.
    pub fn is_empty(&self) -> bool {
        self.qualifiers.is_empty()
    }
}

impl<T: 'static> Default for CompositeQualifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Qualifier<T> for CompositeQualifier<T> {
    fn filter<'a>(&'a self, candidates: Candidates<'a, T>) -> Candidates<'a, T> {
        self.qualifiers
            .iter()
            .fold(candidates, |stream, q| q.filter(stream))
    }
}

impl<T: 'static> fmt::Display for CompositeQualifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for q in &self.qualifiers {
            if !first {
                f.write_str(" and ")?;
            }
            write!(f, "{q}")?;
            first = false;
        }
        Ok(())
    }
}

// Equality and hashing go through the textual form of the constituents so
// that composites remain comparable despite holding trait objects.
impl<T: 'static> PartialEq for CompositeQualifier<T> {
    fn eq(&self, other: &Self) -> bool {
        self.qualifiers.len() == other.qualifiers.len()
            && self
                .qualifiers
                .iter()
                .zip(&other.qualifiers)
                .all(|(a, b)| a.to_string() == b.to_string())
    }
}

impl<T: 'static> Eq for CompositeQualifier<T> {}

impl<T: 'static> std::hash::Hash for CompositeQualifier<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for q in &self.qualifiers {
            q.to_string().hash(state);
        }
    }
}

impl<T: 'static> fmt::Debug for CompositeQualifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositeQualifier({self})")
    }
}

/// Keeps descriptors whose name equals the given one.
pub struct NamedQualifier<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

/// Selects descriptors by exact name.
pub fn by_name<T>(name: impl Into<String>) -> NamedQualifier<T> {
    NamedQualifier {
        name: name.into(),
        _marker: PhantomData,
    }
}

impl<T: 'static> Qualifier<T> for NamedQualifier<T> {
    fn filter<'a>(&'a self, candidates: Candidates<'a, T>) -> Candidates<'a, T> {
        Box::new(candidates.filter(move |d| d.name() == self.name))
    }
}

impl<T> fmt::Display for NamedQualifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@Named({})", self.name)
    }
}

/// Keeps descriptors whose declared version equals the given one.
pub struct VersionQualifier<T> {
    version: String,
    _marker: PhantomData<fn() -> T>,
}

/// Selects descriptors by exact version.
pub fn by_version<T>(version: impl Into<String>) -> VersionQualifier<T> {
    VersionQualifier {
        version: version.into(),
        _marker: PhantomData,
    }
}

impl<T: 'static> Qualifier<T> for VersionQualifier<T> {
    fn filter<'a>(&'a self, candidates: Candidates<'a, T>) -> Candidates<'a, T> {
        Box::new(candidates.filter(move |d| d.version() == Some(self.version.as_str())))
    }
}

impl<T> fmt::Display for VersionQualifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@Version({})", self.version)
    }
}
