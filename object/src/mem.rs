//! This module contains the implementation for an in-memory DICOM object.

use dcmbridge_core::value::{PrimitiveValue, Value};
use dcmbridge_core::{DataElement, Tag, VR};
use dcmbridge_dictionary_std::tags;
use indexmap::map::{IntoIter, Iter};
use indexmap::IndexMap;

/// A full in-memory DICOM data element.
pub type InMemElement = DataElement<InMemDicomObject>;

/** A DICOM object that is fully contained in memory.
 *
 * Elements keep the order in which they were inserted.
 * Two objects are equal when they hold the same elements,
 * regardless of that order.
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemDicomObject {
    /// the element map
    entries: IndexMap<Tag, InMemElement>,
}

impl InMemDicomObject {
    /// Create a new empty DICOM object.
    pub fn new_empty() -> Self {
        InMemDicomObject::default()
    }

    /// Construct a DICOM object from an iterator of in-memory elements.
    pub fn from_element_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = InMemElement>,
    {
        InMemDicomObject {
            entries: iter.into_iter().map(|e| (e.tag(), e)).collect(),
        }
    }

    /// Retrieve a particular DICOM element by its tag.
    pub fn element(&self, tag: Tag) -> Option<&InMemElement> {
        self.entries.get(&tag)
    }

    /// Retrieve a particular DICOM element by its tag, for modification.
    pub fn element_mut(&mut self, tag: Tag) -> Option<&mut InMemElement> {
        self.entries.get_mut(&tag)
    }

    /// Insert a data element to the object, replacing (and returning) any
    /// previous element of the same attribute.
    pub fn put(&mut self, elt: InMemElement) -> Option<InMemElement> {
        self.entries.insert(elt.tag(), elt)
    }

    /// Insert a primitive data element built from its parts.
    pub fn put_primitive(
        &mut self,
        tag: Tag,
        vr: VR,
        value: impl Into<PrimitiveValue>,
    ) -> Option<InMemElement> {
        self.put(DataElement::new(tag, vr, value.into()))
    }

    /// Remove a DICOM element by its tag,
    /// reporting whether it was present.
    pub fn remove_element(&mut self, tag: Tag) -> bool {
        self.entries.shift_remove(&tag).is_some()
    }

    /// Remove a DICOM element by its tag, returning it.
    pub fn take_element(&mut self, tag: Tag) -> Option<InMemElement> {
        self.entries.shift_remove(&tag)
    }

    /// Keep only the elements for which the predicate holds.
    pub fn retain(&mut self, mut f: impl FnMut(&InMemElement) -> bool) {
        self.entries.retain(|_, e| f(e));
    }

    /// The number of elements at this level.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the object has no elements.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Obtain an iterator over the elements of this object.
    pub fn iter(&self) -> impl Iterator<Item = &InMemElement> + '_ {
        self.entries.values()
    }

    /// Obtain an iterator over the elements of this object, for modification.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut InMemElement> + '_ {
        self.entries.values_mut()
    }

    /// Obtain an iterator over the tags of the object's elements.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.entries.keys().copied()
    }

    /// Obtain the elements sorted by tag,
    /// which is the order in which they are encoded.
    pub fn sorted_elements(&self) -> Vec<&InMemElement> {
        let mut elements: Vec<_> = self.entries.values().collect();
        elements.sort_by_key(|e| e.tag());
        elements
    }

    /// Obtain the raw bytes of a primitive text element.
    pub fn raw_text(&self, tag: Tag) -> Option<&[u8]> {
        self.element(tag)?.value().primitive()?.text()
    }

    /// Obtain the value of a text element,
    /// interpreted as plain ASCII with surrounding spaces trimmed.
    ///
    /// This is suitable for identifiers and code strings.
    pub fn ascii_value(&self, tag: Tag) -> Option<String> {
        let text = self.raw_text(tag)?;
        Some(String::from_utf8_lossy(text).trim().to_string())
    }

    /// The Pixel Representation of this object,
    /// `1` for signed pixel samples and `0` (the default) for unsigned ones.
    pub fn pixel_representation(&self) -> u16 {
        self.element(tags::PIXEL_REPRESENTATION)
            .and_then(|e| e.value().primitive())
            .and_then(|v| v.to_i64s())
            .and_then(|v| v.first().copied())
            .map_or(0, |v| v as u16)
    }

    /// Look up the private creator which reserved the block
    /// of the given private data element, in this same item.
    ///
    /// ```
    /// # use dcmbridge_core::{Tag, VR};
    /// # use dcmbridge_object::InMemDicomObject;
    /// let mut obj = InMemDicomObject::new_empty();
    /// obj.put_primitive(Tag(0x0029, 0x0011), VR::LO, "SIEMENS CSA HEADER");
    /// assert_eq!(
    ///     obj.private_creator_of(Tag(0x0029, 0x1108)).as_deref(),
    ///     Some("SIEMENS CSA HEADER")
    /// );
    /// assert_eq!(obj.private_creator_of(Tag(0x0029, 0x1208)), None);
    /// ```
    pub fn private_creator_of(&self, tag: Tag) -> Option<String> {
        let creator_tag = tag.private_creator_tag()?;
        self.ascii_value(creator_tag).filter(|s| !s.is_empty())
    }

    /// Retrieve the values of the Specific Character Set attribute,
    /// if present.
    pub fn specific_character_set(&self) -> Option<Vec<String>> {
        let text = self.raw_text(tags::SPECIFIC_CHARACTER_SET).or_else(|| {
            // present, but empty
            self.element(tags::SPECIFIC_CHARACTER_SET)
                .and_then(|e| e.value().primitive())
                .filter(|v| v.is_empty())
                .map(|_| &[][..])
        })?;
        Some(
            String::from_utf8_lossy(text)
                .split('\\')
                .map(|s| s.trim().to_string())
                .collect(),
        )
    }

    /// The depth of the deepest sequence nesting in this object.
    pub fn nesting_depth(&self) -> usize {
        self.iter()
            .filter_map(|e| e.items())
            .flat_map(|items| items.iter())
            .map(|item| 1 + item.nesting_depth())
            .max()
            .unwrap_or(0)
    }
}

impl FromIterator<InMemElement> for InMemDicomObject {
    fn from_iter<T: IntoIterator<Item = InMemElement>>(iter: T) -> Self {
        InMemDicomObject::from_element_iter(iter)
    }
}

impl Extend<InMemElement> for InMemDicomObject {
    fn extend<T: IntoIterator<Item = InMemElement>>(&mut self, iter: T) {
        for e in iter {
            self.put(e);
        }
    }
}

/// Base iterator type for an in-memory DICOM object.
#[derive(Debug)]
pub struct Elements<'a> {
    inner: Iter<'a, Tag, InMemElement>,
}

impl<'a> Iterator for Elements<'a> {
    type Item = &'a InMemElement;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

impl<'a> IntoIterator for &'a InMemDicomObject {
    type Item = &'a InMemElement;
    type IntoIter = Elements<'a>;

    fn into_iter(self) -> Self::IntoIter {
        Elements {
            inner: self.entries.iter(),
        }
    }
}

/// Owning iterator over the elements of an in-memory DICOM object.
#[derive(Debug)]
pub struct IntoElements {
    inner: IntoIter<Tag, InMemElement>,
}

impl Iterator for IntoElements {
    type Item = InMemElement;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

impl IntoIterator for InMemDicomObject {
    type Item = InMemElement;
    type IntoIter = IntoElements;

    fn into_iter(self) -> Self::IntoIter {
        IntoElements {
            inner: self.entries.into_iter(),
        }
    }
}

/// Build a sequence element out of its items.
pub fn sequence(tag: Tag, items: Vec<InMemDicomObject>) -> InMemElement {
    DataElement::new(tag, VR::SQ, Value::Sequence(items))
}
