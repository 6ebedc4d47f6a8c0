/*
This code is part of the geocodec library.
License: MIT

NOTE: The attribute table (.dbf) itself is read and written elsewhere; this
module only describes how the geometry side talks to it.
*/
use crate::error::{Result, ShapefileError};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DateData {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl fmt::Display for DateData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Int(i32),
    Int64(i64),
    Real(f64),
    Text(String),
    Date(DateData),
    Bool(bool),
    Null,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct AttributeField {
    pub name: String,
    /// dBase field type: C, N, F, L or D.
    pub field_type: char,
    pub field_length: u8,
    pub decimal_count: u8,
}

impl AttributeField {
    pub fn new(name: &str, field_type: char, field_length: u8, decimal_count: u8) -> AttributeField {
        AttributeField {
            name: name.to_string(),
            field_type,
            field_length,
            decimal_count,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.field_type, 'N' | 'F')
    }
}

/// A paged source of attribute rows, one per shape, in record order.
pub trait AttributeSource {
    fn num_rows(&self) -> usize;

    fn num_fields(&self) -> usize;

    /// Returns up to `count` rows starting at row `start`.
    fn supply_page(&self, start: usize, count: usize) -> Result<Vec<Vec<FieldData>>>;

    fn add_row(&mut self, row: Vec<FieldData>) -> Result<()>;

    fn edit(&mut self, row: usize, field: usize, value: FieldData) -> Result<()>;

    /// Removes a row, keeping rows aligned with shapes after a shape is removed.
    fn remove_row(&mut self, row: usize) -> Result<Vec<FieldData>>;
}

/// An attribute table held in memory.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AttributeTable {
    pub fields: Vec<AttributeField>,
    rows: Vec<Vec<FieldData>>,
}

impl AttributeTable {
    pub fn new(fields: Vec<AttributeField>) -> AttributeTable {
        AttributeTable {
            fields,
            rows: vec![],
        }
    }

    pub fn get_field_num(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn get_record(&self, index: usize) -> Result<&[FieldData]> {
        self.rows
            .get(index)
            .map(|r| r.as_slice())
            .ok_or(ShapefileError::OutOfBounds {
                index,
                len: self.rows.len(),
            })
    }
}

impl AttributeSource for AttributeTable {
    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn num_fields(&self) -> usize {
        self.fields.len()
    }

    fn supply_page(&self, start: usize, count: usize) -> Result<Vec<Vec<FieldData>>> {
        if start > self.rows.len() {
            return Err(ShapefileError::OutOfBounds {
                index: start,
                len: self.rows.len(),
            });
        }
        let end = (start + count).min(self.rows.len());
        Ok(self.rows[start..end].to_vec())
    }

    fn add_row(&mut self, row: Vec<FieldData>) -> Result<()> {
        if row.len() != self.fields.len() {
            return Err(ShapefileError::InvariantViolation(format!(
                "row has {} values for {} fields",
                row.len(),
                self.fields.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    fn edit(&mut self, row: usize, field: usize, value: FieldData) -> Result<()> {
        let num_rows = self.rows.len();
        let num_fields = self.fields.len();
        let record = self
            .rows
            .get_mut(row)
            .ok_or(ShapefileError::OutOfBounds {
                index: row,
                len: num_rows,
            })?;
        let slot = record.get_mut(field).ok_or(ShapefileError::OutOfBounds {
            index: field,
            len: num_fields,
        })?;
        *slot = value;
        Ok(())
    }

    fn remove_row(&mut self, row: usize) -> Result<Vec<FieldData>> {
        if row >= self.rows.len() {
            return Err(ShapefileError::OutOfBounds {
                index: row,
                len: self.rows.len(),
            });
        }
        Ok(self.rows.remove(row))
    }
}
