use crate::prelude::*;

use std::fmt;

/// Accepted character width of one comma separated response field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldLength {
    min: usize,
    max: usize,
}

impl FieldLength {
    pub const fn exact(len: usize) -> Self {
        Self { min: len, max: len }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn accepts(&self, len: usize) -> bool {
        (self.min..=self.max).contains(&len)
    }
}

impl fmt::Display for FieldLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "[{}, {}]", self.min, self.max)
        }
    }
}

/// Shorthand for a table of exact widths.
pub const fn w(len: usize) -> FieldLength {
    FieldLength::exact(len)
}

/// The split payload of one get response, with typed accessors that report
/// failures against the record being decoded.
pub struct Fields<'a> {
    record: &'static str,
    items: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    /// Splits `data` on commas and checks the result against `lengths`.
    ///
    /// At least `at_least` items must be present (all of `lengths` when
    /// `None`). Items beyond the table are logged and left unchecked. An
    /// empty table disables every check.
    pub fn split(
        record: &'static str,
        data: &'a str,
        lengths: &[FieldLength],
        at_least: Option<usize>,
    ) -> Result<Self> {
        let items: Vec<&str> = data.split(',').collect();

        if !lengths.is_empty() {
            let expected = at_least.unwrap_or(lengths.len());
            if items.len() < expected {
                return Err(Error::Parse(format!(
                    "while parsing {}: list is expected to be {} items long, got only {} items",
                    record,
                    expected,
                    items.len()
                )));
            }

            for (i, item) in items.iter().enumerate() {
                let Some(length) = lengths.get(i) else {
                    warn!("while parsing {}: item {} is not expected", record, i);
                    break;
                };

                if !length.accepts(item.len()) {
                    return Err(Error::Parse(format!(
                        "while parsing {}: item {} is expected to be {} characters long, got {} characters",
                        record,
                        i,
                        length,
                        item.len()
                    )));
                }
            }
        }

        Ok(Self { record, items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn item(&self, index: usize) -> Result<&'a str> {
        self.items.get(index).copied().ok_or_else(|| {
            Error::Parse(format!("while parsing {}: item {} is missing", self.record, index))
        })
    }

    pub fn text(&self, index: usize) -> Result<String> {
        Ok(self.item(index)?.to_string())
    }

    pub fn u32(&self, index: usize) -> Result<u32> {
        number(self.record, self.item(index)?)
    }

    pub fn flag(&self, index: usize) -> Result<bool> {
        Ok(self.u32(index)? > 0)
    }

    pub fn enumeration<T: TryFrom<u8>>(&self, index: usize) -> Result<T> {
        let value = self.u32(index)?;
        u8::try_from(value)
            .ok()
            .and_then(|v| T::try_from(v).ok())
            .ok_or_else(|| {
                Error::Parse(format!(
                    "while parsing {}: item {} has unknown value {}",
                    self.record, index, value
                ))
            })
    }

    pub fn all_u32(&self) -> Result<Vec<u32>> {
        self.items.iter().map(|item| number(self.record, item)).collect()
    }
}

pub fn number(record: &'static str, s: &str) -> Result<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Parse(format!(
            "while parsing {}: {:?} is not a number",
            record, s
        )));
    }

    s.parse()
        .map_err(|_| Error::Parse(format!("while parsing {}: {} is out of range", record, s)))
}

/// Fixed-offset slice of a payload that has no separators.
pub fn fixed<'a>(record: &'static str, data: &'a str, start: usize, len: usize) -> Result<&'a str> {
    data.get(start..start + len).ok_or_else(|| {
        Error::Parse(format!(
            "while parsing {}: expected at least {} characters, got {}",
            record,
            start + len,
            data.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::p18::types::WorkingMode;

    #[test]
    fn width_display() {
        assert_eq!(FieldLength::exact(3).to_string(), "3");
        assert_eq!(FieldLength::range(2, 3).to_string(), "[2, 3]");
    }

    #[test]
    fn too_few_items() {
        let err = Fields::split("Test", "1,2", &[w(1), w(1), w(1)], None)
            .err()
            .unwrap();
        assert_eq!(
            err,
            Error::Parse(
                "while parsing Test: list is expected to be 3 items long, got only 2 items".into()
            )
        );
    }

    #[test]
    fn wrong_width_names_index() {
        let err = Fields::split("Test", "1,22,3", &[w(1), w(1), w(1)], None)
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "while parsing Test: item 1 is expected to be 1 characters long, got 2 characters"
        );

        let err = Fields::split("Test", "1,2345", &[w(1), FieldLength::range(2, 3)], None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("item 1 is expected to be [2, 3] characters long"));
    }

    #[test]
    fn trailing_items_are_tolerated() {
        let fields = Fields::split("Test", "1,2,extra", &[w(1), w(1)], None).unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.u32(1).unwrap(), 2);
    }

    #[test]
    fn optional_tail() {
        let fields = Fields::split("Test", "1,2", &[w(1), w(1), w(3)], Some(2)).unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn typed_accessors() {
        let fields = Fields::split("Test", "5,0,1,9", &[], None).unwrap();
        assert_eq!(fields.enumeration::<WorkingMode>(0).unwrap(), WorkingMode::Hybrid);
        assert!(!fields.flag(1).unwrap());
        assert!(fields.flag(2).unwrap());
        assert!(matches!(fields.enumeration::<WorkingMode>(3), Err(Error::Parse(_))));
        assert_eq!(fields.all_u32().unwrap(), vec![5, 0, 1, 9]);
    }

    #[test]
    fn fixed_slices() {
        assert_eq!(fixed("Test", "20241019", 4, 2).unwrap(), "10");
        assert!(fixed("Test", "2024", 2, 4).is_err());
    }
}
