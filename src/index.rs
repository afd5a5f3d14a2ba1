//! Symbolic indices over finite inclusive ranges.
//!
//! An index is a named slot ranging over a finite set of unsigned values.
//! A tensor declares an ordered sequence of indices; evaluation assigns a
//! value to every name. Contraction is a name shared between operands of a
//! product and is summed over the common range.

use std::collections::BTreeMap;
use std::ops::Range;

use indexmap::IndexMap;

use crate::error::{TensorError, TensorResult};

// ============================================================================
// RANGES
// ============================================================================

/// Inclusive range of values an index can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexRange {
    from: usize,
    to: usize,
}

impl IndexRange {
    pub fn new(from: usize, to: usize) -> Self {
        assert!(from <= to, "index range must be non-empty");
        Self { from, to }
    }

    /// Full spacetime range 0..=3.
    pub fn space_time() -> Self {
        Self::new(0, 3)
    }

    /// Spatial slice range 1..=3.
    pub fn space() -> Self {
        Self::new(1, 3)
    }

    pub fn from(&self) -> usize {
        self.from
    }

    pub fn to(&self) -> usize {
        self.to
    }

    /// Number of values in the range.
    pub fn len(&self) -> usize {
        self.to - self.from + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, value: usize) -> bool {
        self.from <= value && value <= self.to
    }

    pub fn values(&self) -> impl Iterator<Item = usize> {
        self.from..=self.to
    }
}

// ============================================================================
// INDICES
// ============================================================================

/// A single symbolic index.
///
/// Two indices are equal iff their names and ranges match; the rendered
/// glyph and the variance flag do not participate in equality.
#[derive(Clone, Debug)]
pub struct Index {
    name: String,
    printable: String,
    range: IndexRange,
    contravariant: bool,
}

impl Index {
    pub fn new(name: impl Into<String>, printable: impl Into<String>, range: IndexRange) -> Self {
        Self {
            name: name.into(),
            printable: printable.into(),
            range,
            contravariant: false,
        }
    }

    /// Covariant index whose glyph equals its name.
    pub fn named(name: impl Into<String>, range: IndexRange) -> Self {
        let name = name.into();
        let printable = name.clone();
        Self {
            name,
            printable,
            range,
            contravariant: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn printable(&self) -> &str {
        &self.printable
    }

    pub fn range(&self) -> IndexRange {
        self.range
    }

    pub fn is_contravariant(&self) -> bool {
        self.contravariant
    }

    pub fn set_contravariant(&mut self, contravariant: bool) {
        self.contravariant = contravariant;
    }
}

impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.range == other.range
    }
}

impl Eq for Index {}

impl PartialOrd for Index {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Index {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.range.cmp(&other.range))
    }
}

impl std::fmt::Display for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.printable)
    }
}

const GREEK: &[(&str, &str)] = &[
    ("mu", "\\mu"),
    ("nu", "\\nu"),
    ("kappa", "\\kappa"),
    ("lambda", "\\lambda"),
    ("rho", "\\rho"),
    ("sigma", "\\sigma"),
    ("tau", "\\tau"),
    ("alpha", "\\alpha"),
    ("beta", "\\beta"),
    ("gamma", "\\gamma"),
    ("delta", "\\delta"),
    ("epsilon", "\\epsilon"),
    ("zeta", "\\zeta"),
    ("eta", "\\eta"),
    ("theta", "\\theta"),
    ("iota", "\\iota"),
    ("xi", "\\xi"),
    ("pi", "\\pi"),
    ("phi", "\\phi"),
    ("chi", "\\chi"),
    ("psi", "\\psi"),
    ("omega", "\\omega"),
];

/// An ordered sequence of indices.
///
/// Free indices of a single atom are unique by name; product headers may
/// temporarily carry repeated names until the contraction drops them.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Indices {
    indices: Vec<Index>,
}

impl Indices {
    pub fn new(indices: Vec<Index>) -> Self {
        Self { indices }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Series of greek indices `mu, nu, ...` over the given range.
    pub fn greek_series(count: usize, range: IndexRange, offset: usize) -> Self {
        let indices = (0..count)
            .map(|i| {
                let (name, printable) = GREEK[(offset + i) % GREEK.len()];
                Index::new(name, printable, range)
            })
            .collect();
        Self { indices }
    }

    /// Series of roman indices `a, b, ...` over the given range.
    pub fn roman_series(count: usize, range: IndexRange, offset: usize) -> Self {
        let indices = (0..count)
            .map(|i| {
                let c = (b'a' + ((offset + i) % 26) as u8) as char;
                Index::named(c.to_string(), range)
            })
            .collect();
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Index> {
        self.indices.iter()
    }

    pub fn as_slice(&self) -> &[Index] {
        &self.indices
    }

    pub fn push(&mut self, index: Index) {
        self.indices.push(index);
    }

    pub fn insert_front(&mut self, index: Index) {
        self.indices.insert(0, index);
    }

    pub fn append(&mut self, other: &Indices) {
        self.indices.extend(other.indices.iter().cloned());
    }

    pub fn contains(&self, index: &Index) -> bool {
        self.indices.contains(index)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.indices.iter().any(|i| i.name() == name)
    }

    pub fn position_of(&self, index: &Index) -> Option<usize> {
        self.indices.iter().position(|i| i == index)
    }

    pub fn set_variance(&mut self, position: usize, contravariant: bool) {
        self.indices[position].set_contravariant(contravariant);
    }

    /// Stable sort by name.
    pub fn ordered(&self) -> Indices {
        let mut sorted = self.indices.clone();
        sorted.sort();
        Indices { indices: sorted }
    }

    /// Slice of the sequence.
    pub fn partial(&self, range: Range<usize>) -> Indices {
        Indices {
            indices: self.indices[range].to_vec(),
        }
    }

    /// Indices of the concatenation `self ++ other` whose names occur
    /// exactly once, in concatenation order (left's uniques first).
    ///
    /// A name occurring more than twice cannot be contracted.
    pub fn contract(&self, other: &Indices) -> TensorResult<Indices> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for index in self.iter().chain(other.iter()) {
            *counts.entry(index.name()).or_insert(0) += 1;
        }
        if let Some((name, _)) = counts.iter().find(|&(_, &c)| c > 2) {
            return Err(TensorError::CannotContract(format!(
                "index '{}' occurs more than twice",
                name
            )));
        }

        let surviving = self
            .iter()
            .chain(other.iter())
            .filter(|index| counts[index.name()] == 1)
            .cloned()
            .collect();

        Ok(Indices { indices: surviving })
    }

    /// Substitute every index through the mapping; unmapped indices are kept.
    pub fn shuffle(&self, mapping: &BTreeMap<Index, Index>) -> Indices {
        let indices = self
            .indices
            .iter()
            .map(|index| mapping.get(index).unwrap_or(index).clone())
            .collect();
        Indices { indices }
    }

    /// True iff the sequences contain the same indices with the same
    /// multiplicities, in any order.
    pub fn is_permutation_of(&self, other: &Indices) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut counts: BTreeMap<&Index, isize> = BTreeMap::new();
        for index in self.iter() {
            *counts.entry(index).or_insert(0) += 1;
        }
        for index in other.iter() {
            *counts.entry(index).or_insert(0) -= 1;
        }
        counts.values().all(|&c| c == 0)
    }

    /// True iff some name occurs more than once.
    pub fn contains_contractions(&self) -> bool {
        let mut seen: BTreeMap<&str, ()> = BTreeMap::new();
        for index in self.iter() {
            if seen.insert(index.name(), ()).is_some() {
                return true;
            }
        }
        false
    }

    /// True iff every index ranges over the same values.
    pub fn all_ranges_equal(&self) -> bool {
        self.indices
            .iter()
            .all(|i| i.range() == self.indices[0].range())
    }

    /// Iterate over all value combinations of the index ranges
    /// (odometer order, last index fastest).
    pub fn all_combinations(&self) -> IndexCombinations {
        IndexCombinations::new(self)
    }
}

impl std::ops::Index<usize> for Indices {
    type Output = Index;

    fn index(&self, position: usize) -> &Index {
        &self.indices[position]
    }
}

impl FromIterator<Index> for Indices {
    fn from_iter<T: IntoIterator<Item = Index>>(iter: T) -> Self {
        Indices {
            indices: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Indices {
    type Item = &'a Index;
    type IntoIter = std::slice::Iter<'a, Index>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.iter()
    }
}

impl std::fmt::Display for Indices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Contiguous runs of equal variance share one bracket group.
        let mut position = 0;
        while position < self.indices.len() {
            let contravariant = self.indices[position].is_contravariant();
            let start = position;
            while position < self.indices.len()
                && self.indices[position].is_contravariant() == contravariant
            {
                position += 1;
            }
            write!(f, "{}{{", if contravariant { "^" } else { "_" })?;
            for (i, index) in self.indices[start..position].iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", index)?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

// ============================================================================
// COMBINATION ITERATION
// ============================================================================

/// Iterator over all value tuples of an index sequence (odometer style).
///
/// An empty sequence yields exactly one empty combination, so rank-0
/// tensors still evaluate once.
pub struct IndexCombinations {
    ranges: Vec<IndexRange>,
    current: Vec<usize>,
    done: bool,
}

impl IndexCombinations {
    fn new(indices: &Indices) -> Self {
        let ranges: Vec<IndexRange> = indices.iter().map(|i| i.range()).collect();
        let current = ranges.iter().map(|r| r.from()).collect();
        Self {
            ranges,
            current,
            done: false,
        }
    }
}

impl Iterator for IndexCombinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current.clone();

        if self.ranges.is_empty() {
            self.done = true;
            return Some(result);
        }

        // Advance (odometer style)
        for i in (0..self.ranges.len()).rev() {
            self.current[i] += 1;
            if self.current[i] <= self.ranges[i].to() {
                break;
            }
            self.current[i] = self.ranges[i].from();
            if i == 0 {
                self.done = true;
            }
        }

        Some(result)
    }
}

// ============================================================================
// ASSIGNMENTS
// ============================================================================

/// Name-keyed value map used to evaluate a tensor regardless of its
/// internal index ordering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexAssignments {
    values: IndexMap<String, usize>,
}

impl IndexAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assignment pairing each index of the sequence with the
    /// corresponding positional argument.
    pub fn from_indices(indices: &Indices, args: &[usize]) -> TensorResult<Self> {
        if args.len() != indices.len() {
            return Err(TensorError::IncompleteIndexAssignment {
                expected: indices.len(),
                got: args.len(),
            });
        }
        let mut assignment = Self::new();
        for (index, &value) in indices.iter().zip(args) {
            assignment.insert(index.name(), value);
        }
        Ok(assignment)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: usize) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Positional argument vector for the given index order.
    pub fn apply(&self, indices: &Indices) -> TensorResult<Vec<usize>> {
        let mut args = Vec::with_capacity(indices.len());
        for index in indices.iter() {
            match self.get(index.name()) {
                Some(value) => args.push(value),
                None => {
                    return Err(TensorError::IncompleteIndexAssignment {
                        expected: indices.len(),
                        got: args.len(),
                    })
                }
            }
        }
        Ok(args)
    }
}

// ============================================================================
// TESTS
// ============================================================================
