//! Named, finite-domain block state properties.
//!
//! A [`Property`] is the descriptor of one enumerable attribute of a block type
//! (e.g. orientation, on/off, an integer level). Properties are immutable,
//! compare by value, and are usable as map keys; the set of legal values is
//! fixed at construction and deliberately small, which bounds the size of the
//! Cartesian product a [`StateDefinition`](crate::state::StateDefinition)
//! builds over them.

use std::fmt;
use std::sync::Arc;

use arcstr::ArcStr;

/// The largest number of legal values a single [`Property`] may declare.
///
/// Exceeding it is rejected at construction time; this bounds worst-case
/// combinatorial blow-up of state tables.
pub const MAX_DOMAIN_VALUES: usize = 16;

/// One legal value of a [`Property`].
///
/// Values are compared by value and ordered by their position in the declaring
/// property's domain, not by any intrinsic ordering of the variants.
#[derive(Clone, Eq, Hash, PartialEq)]
pub enum PropertyValue {
    /// Value of a boolean property.
    Bool(bool),
    /// Value of a bounded integer property.
    Int(u8),
    /// Value of a closed enumeration property.
    Name(ArcStr),
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Name(n) => write!(f, "{n}"),
        }
    }
}

/// A named, ordered, finite domain of legal values for one block attribute.
///
/// Cheap to clone (shared); equality and hashing are by name and domain, so a
/// `Property` works as both the domain descriptor and a dictionary key.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Property(Arc<PropertyInner>);

#[derive(Eq, Hash, PartialEq)]
struct PropertyInner {
    name: ArcStr,
    domain: Vec<PropertyValue>,
}

impl Property {
    /// Constructs a boolean property with domain `[false, true]`.
    #[track_caller]
    pub fn boolean(name: impl Into<ArcStr>) -> Self {
        Self::new(
            name.into(),
            vec![PropertyValue::Bool(false), PropertyValue::Bool(true)],
        )
    }

    /// Constructs a bounded integer property with domain `min..=max`.
    #[track_caller]
    pub fn int(name: impl Into<ArcStr>, min: u8, max: u8) -> Self {
        assert!(min <= max, "integer property range is inverted");
        Self::new(
            name.into(),
            (min..=max).map(PropertyValue::Int).collect(),
        )
    }

    /// Constructs a closed-enumeration property whose domain is the given
    /// names in order.
    #[track_caller]
    pub fn enumerated<'a>(
        name: impl Into<ArcStr>,
        values: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self::new(
            name.into(),
            values
                .into_iter()
                .map(|v| PropertyValue::Name(ArcStr::from(v)))
                .collect(),
        )
    }

    /// All construction funnels through here so the domain invariants are
    /// checked in one place. These are programmer errors, checked eagerly
    /// at startup, hence panics rather than `Result`s.
    #[track_caller]
    fn new(name: ArcStr, domain: Vec<PropertyValue>) -> Self {
        assert!(
            is_valid_name(&name),
            "property name {name:?} must be lowercase [a-z0-9_] and start with a letter",
        );
        assert!(!domain.is_empty(), "property {name:?} has an empty domain");
        assert!(
            domain.len() <= MAX_DOMAIN_VALUES,
            "property {name:?} declares {} values; the limit is {MAX_DOMAIN_VALUES}",
            domain.len(),
        );
        if let Some(PropertyValue::Name(bad)) = domain
            .iter()
            .find(|v| matches!(v, PropertyValue::Name(n) if !is_valid_name(n)))
        {
            panic!("property {name:?} value {bad:?} must be lowercase [a-z0-9_]");
        }
        Self(Arc::new(PropertyInner { name, domain }))
    }

    /// The property's name.
    pub fn name(&self) -> &ArcStr {
        &self.0.name
    }

    /// The ordered domain of legal values.
    pub fn domain(&self) -> &[PropertyValue] {
        &self.0.domain
    }

    /// Number of legal values.
    pub fn domain_len(&self) -> usize {
        self.0.domain.len()
    }

    /// Position of `value` within the domain, or [`None`] if it is not a legal
    /// value of this property.
    pub fn index_of(&self, value: &PropertyValue) -> Option<usize> {
        self.0.domain.iter().position(|v| v == value)
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property({:?} in {:?})", self.0.name, self.0.domain)
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some('a'..='z'))
        && chars.all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
}

/// An assignment of values to properties, in the declaring block's property
/// order. Domains are tiny, so lookups are linear scans.
pub type Assignment = [(Property, PropertyValue)];

/// Finds the value assigned to `property`, if present.
pub fn lookup<'a>(assignment: &'a Assignment, property: &Property) -> Option<&'a PropertyValue> {
    assignment
        .iter()
        .find(|(p, _)| p == property)
        .map(|(_, v)| v)
}

/// [`lookup`] narrowed to boolean properties.
pub fn lookup_bool(assignment: &Assignment, property: &Property) -> Option<bool> {
    match lookup(assignment, property)? {
        PropertyValue::Bool(b) => Some(*b),
        _ => None,
    }
}

/// [`lookup`] narrowed to integer properties.
pub fn lookup_int(assignment: &Assignment, property: &Property) -> Option<u8> {
    match lookup(assignment, property)? {
        PropertyValue::Int(i) => Some(*i),
        _ => None,
    }
}

/// [`lookup`] narrowed to enumeration properties.
pub fn lookup_name<'a>(assignment: &'a Assignment, property: &Property) -> Option<&'a ArcStr> {
    match lookup(assignment, property)? {
        PropertyValue::Name(n) => Some(n),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn domains_are_ordered_as_declared() {
        let level = Property::int("level", 0, 3);
        assert_eq!(
            level.domain(),
            &[
                PropertyValue::Int(0),
                PropertyValue::Int(1),
                PropertyValue::Int(2),
                PropertyValue::Int(3),
            ]
        );
        assert_eq!(level.index_of(&PropertyValue::Int(2)), Some(2));
        assert_eq!(level.index_of(&PropertyValue::Int(4)), None);

        let half = Property::enumerated("half", ["lower", "upper"]);
        assert_eq!(half.index_of(&PropertyValue::Name("upper".into())), Some(1));
    }

    #[test]
    fn equal_definitions_are_interchangeable_keys() {
        let a = Property::boolean("powered");
        let b = Property::boolean("powered");
        assert_eq!(a, b);

        let assignment = [(a, PropertyValue::Bool(true))];
        assert_eq!(lookup_bool(&assignment, &b), Some(true));
    }

    #[test]
    #[should_panic(expected = "the limit is 16")]
    fn oversized_domain_rejected() {
        Property::int("power", 0, 16); // 17 values
    }

    #[test]
    #[should_panic(expected = "must be lowercase")]
    fn bad_name_rejected() {
        Property::boolean("Powered");
    }

    #[test]
    fn sixteen_values_is_the_maximum_allowed() {
        let power = Property::int("power", 0, 15);
        assert_eq!(power.domain_len(), MAX_DOMAIN_VALUES);
    }

    #[test]
    fn typed_lookups_reject_mismatched_kinds() {
        let open = Property::boolean("open");
        let assignment = [(open.clone(), PropertyValue::Bool(false))];
        assert_eq!(lookup_int(&assignment, &open), None);
        assert_eq!(lookup_bool(&assignment, &open), Some(false));
    }
}
