//! Typed, dimensioned value buffer attached to a metadata node.
//!
//! A [`MetaDataInfo`] stores one of four formats (`Char`, `Byte`, `Integer`,
//! `Real`) together with its dimensions. Numeric formats keep one element per
//! cell, so the buffer length is the product of all dimensions (1 for a
//! scalar with no dimension). Text keeps one row per string: the first
//! dimension is the row width and the buffer holds the product of the
//! remaining dimensions. A row width of 0 leaves rows variable-length.
//!
//! Rows are stored without their trailing padding; the width is restored
//! when encoding.

use crate::error::{MocapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of dimensions a parameter may declare
pub const MAX_DIMENSIONS: usize = 7;

/// Maximum number of elements a parameter may hold
pub const MAX_ELEMENTS: usize = 65535;

/// Storage format of the values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetaDataFormat {
    Char,
    Byte,
    Integer,
    Real,
}

impl MetaDataFormat {
    /// Type code used by the C3D parameter section
    pub fn type_code(self) -> i8 {
        match self {
            MetaDataFormat::Char => -1,
            MetaDataFormat::Byte => 1,
            MetaDataFormat::Integer => 2,
            MetaDataFormat::Real => 4,
        }
    }

    pub fn from_type_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(MetaDataFormat::Char),
            1 => Some(MetaDataFormat::Byte),
            2 => Some(MetaDataFormat::Integer),
            4 => Some(MetaDataFormat::Real),
            _ => None,
        }
    }

    /// Bytes per element (per character for text)
    pub fn element_size(self) -> usize {
        self.type_code().unsigned_abs() as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetaDataFormat::Char => "Char",
            MetaDataFormat::Byte => "Byte",
            MetaDataFormat::Integer => "Integer",
            MetaDataFormat::Real => "Real",
        }
    }
}

impl fmt::Display for MetaDataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat buffer of values, tagged by format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "values")]
pub enum MetaDataValues {
    Char(Vec<String>),
    Byte(Vec<i8>),
    Integer(Vec<i16>),
    Real(Vec<f32>),
}

impl MetaDataValues {
    pub fn format(&self) -> MetaDataFormat {
        match self {
            MetaDataValues::Char(_) => MetaDataFormat::Char,
            MetaDataValues::Byte(_) => MetaDataFormat::Byte,
            MetaDataValues::Integer(_) => MetaDataFormat::Integer,
            MetaDataValues::Real(_) => MetaDataFormat::Real,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MetaDataValues::Char(v) => v.len(),
            MetaDataValues::Byte(v) => v.len(),
            MetaDataValues::Integer(v) => v.len(),
            MetaDataValues::Real(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resize(&mut self, len: usize) {
        match self {
            MetaDataValues::Char(v) => v.resize(len, String::new()),
            MetaDataValues::Byte(v) => v.resize(len, 0),
            MetaDataValues::Integer(v) => v.resize(len, 0),
            MetaDataValues::Real(v) => v.resize(len, 0.0),
        }
    }
}

/// Typed, dimensioned value payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaDataInfo {
    dims: Vec<u8>,
    values: MetaDataValues,
}

/// Number of buffer elements implied by `dims` for `format`
pub fn element_count(format: MetaDataFormat, dims: &[u8]) -> usize {
    match format {
        MetaDataFormat::Char => dims.iter().skip(1).map(|&d| d as usize).product(),
        _ => dims.iter().map(|&d| d as usize).product(),
    }
}

fn trim_row(s: &str) -> String {
    s.trim_end_matches([' ', '\0']).to_string()
}

/// Dimensions laying out `n` elements with every axis at most 255.
///
/// Up to 255 elements stay one-dimensional. Longer buffers use two axes,
/// exactly when `n` factors that way and otherwise as `[255, rows]` with
/// the last row zero padded.
fn list_dims(n: usize) -> Result<Vec<u8>> {
    let max = u8::MAX as usize;
    if n <= max {
        return Ok(vec![n as u8]);
    }
    let exact = (2..=max)
        .rev()
        .find(|&a| n % a == 0 && n / a <= max)
        .map(|a| vec![a as u8, (n / a) as u8]);
    if let Some(dims) = exact {
        return Ok(dims);
    }
    let rows = n.div_ceil(max);
    if rows > max {
        return Err(MocapError::Format(format!(
            "{} values do not fit in a parameter, at most {} are supported",
            n,
            max * max
        )));
    }
    Ok(vec![max as u8, rows as u8])
}

/// Cut `text` to at most 255 bytes on a character boundary
fn fit_row(text: &str) -> &str {
    let mut end = text.len().min(u8::MAX as usize);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

impl MetaDataInfo {
    /// Build from dimensions and values.
    ///
    /// The buffer is padded (zeros, empty rows) or truncated to the element
    /// count implied by `dims`.
    pub fn new(dims: Vec<u8>, mut values: MetaDataValues) -> Result<Self> {
        if dims.len() > MAX_DIMENSIONS {
            return Err(MocapError::Format(format!(
                "{} dimensions declared, at most {} are supported",
                dims.len(),
                MAX_DIMENSIONS
            )));
        }
        let count = element_count(values.format(), &dims);
        if count > MAX_ELEMENTS {
            return Err(MocapError::Format(format!(
                "{} elements declared, at most {} are supported",
                count, MAX_ELEMENTS
            )));
        }
        if let MetaDataValues::Char(rows) = &mut values {
            for row in rows.iter_mut() {
                *row = trim_row(row);
            }
        }
        values.resize(count);
        Ok(Self { dims, values })
    }

    pub fn from_i8(value: i8) -> Self {
        Self {
            dims: Vec::new(),
            values: MetaDataValues::Byte(vec![value]),
        }
    }

    pub fn from_i16(value: i16) -> Self {
        Self {
            dims: Vec::new(),
            values: MetaDataValues::Integer(vec![value]),
        }
    }

    pub fn from_f32(value: f32) -> Self {
        Self {
            dims: Vec::new(),
            values: MetaDataValues::Real(vec![value]),
        }
    }

    /// Single text row, dimensions `[len]`. Text past 255 bytes is cut.
    pub fn from_text(value: &str) -> Self {
        let row = trim_row(fit_row(value));
        Self {
            dims: vec![row.len() as u8],
            values: MetaDataValues::Char(vec![row]),
        }
    }

    /// Bytes, dimensions `[n]` up to 255 values and two axes past that
    pub fn from_i8s(values: Vec<i8>) -> Result<Self> {
        Self::new(list_dims(values.len())?, MetaDataValues::Byte(values))
    }

    pub fn from_i16s(values: Vec<i16>) -> Result<Self> {
        Self::new(list_dims(values.len())?, MetaDataValues::Integer(values))
    }

    pub fn from_f32s(values: Vec<f32>) -> Result<Self> {
        Self::new(list_dims(values.len())?, MetaDataValues::Real(values))
    }

    /// Text rows, dimensions `[max_len, n]`.
    ///
    /// A row wider than 255 bytes is a format error.
    pub fn from_strings<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let rows: Vec<String> = rows.iter().map(|s| trim_row(s.as_ref())).collect();
        let width = rows.iter().map(|s| s.len()).max().unwrap_or(0);
        if width > u8::MAX as usize {
            return Err(MocapError::Format(format!(
                "Text row of {} bytes, at most {} are supported",
                width,
                u8::MAX
            )));
        }
        let mut dims = vec![width as u8];
        dims.extend(list_dims(rows.len())?);
        Self::new(dims, MetaDataValues::Char(rows))
    }

    /// Payload laid out as by the list constructors
    pub fn from_values(values: MetaDataValues) -> Result<Self> {
        match values {
            MetaDataValues::Char(rows) => Self::from_strings(&rows),
            MetaDataValues::Byte(v) => Self::from_i8s(v),
            MetaDataValues::Integer(v) => Self::from_i16s(v),
            MetaDataValues::Real(v) => Self::from_f32s(v),
        }
    }

    pub fn format(&self) -> MetaDataFormat {
        self.values.format()
    }

    pub fn dimensions(&self) -> &[u8] {
        &self.dims
    }

    /// Product of the dimensions starting at `start`
    pub fn dimensions_product(&self, start: usize) -> usize {
        self.dims.iter().skip(start).map(|&d| d as usize).product()
    }

    pub fn values(&self) -> &MetaDataValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encoded size of the value block in bytes
    pub fn byte_size(&self) -> usize {
        match &self.values {
            MetaDataValues::Char(rows) => self.row_width() * rows.len(),
            other => other.len() * other.format().element_size(),
        }
    }

    /// Width of text rows as encoded
    pub fn row_width(&self) -> usize {
        match (&self.values, self.dims.first()) {
            (MetaDataValues::Char(rows), Some(0)) | (MetaDataValues::Char(rows), None) => {
                rows.iter().map(|s| s.len()).max().unwrap_or(0)
            }
            (MetaDataValues::Char(_), Some(&w)) => w as usize,
            _ => 1,
        }
    }

    /// Replace the payload; dimensions become one-dimensional
    /// (`[max_len, n]` for text). On error the payload is left untouched.
    pub fn set_values(&mut self, values: MetaDataValues) -> Result<()> {
        *self = Self::from_values(values)?;
        Ok(())
    }

    /// Whether the buffer holds exactly the elements its dimensions declare
    pub fn is_consistent(&self) -> bool {
        self.dims.len() <= MAX_DIMENSIONS
            && element_count(self.format(), &self.dims) == self.values.len()
    }

    /// Change the dimensions, padding or truncating the buffer
    pub fn set_dimensions(&mut self, dims: Vec<u8>) -> Result<()> {
        let values = std::mem::replace(&mut self.values, MetaDataValues::Byte(Vec::new()));
        match Self::new(dims, values.clone()) {
            Ok(info) => {
                *self = info;
                Ok(())
            }
            Err(e) => {
                self.values = values;
                Err(e)
            }
        }
    }

    /// Convert the payload to another format
    pub fn set_format(&mut self, format: MetaDataFormat) -> Result<()> {
        if format == self.format() {
            return Ok(());
        }
        let values = match format {
            MetaDataFormat::Char => MetaDataValues::Char(self.to_strings()),
            MetaDataFormat::Byte => MetaDataValues::Byte(
                self.lenient_doubles().into_iter().map(|v| v as i8).collect(),
            ),
            MetaDataFormat::Integer => MetaDataValues::Integer(
                self.lenient_doubles().into_iter().map(|v| v as i16).collect(),
            ),
            MetaDataFormat::Real => MetaDataValues::Real(
                self.lenient_doubles().into_iter().map(|v| v as f32).collect(),
            ),
        };
        if let MetaDataValues::Char(rows) = values {
            *self = Self::from_strings(&rows)?;
            return Ok(());
        }
        let mut dims = self.dims.clone();
        if self.format() == MetaDataFormat::Char && !dims.is_empty() {
            dims.remove(0);
        }
        self.dims = dims;
        self.values = values;
        Ok(())
    }

    fn lenient_doubles(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.to_double(i).unwrap_or(0.0))
            .collect()
    }

    fn check_index(&self, idx: usize) -> Result<()> {
        if idx >= self.len() {
            Err(MocapError::out_of_range(idx, self.len()))
        } else {
            Ok(())
        }
    }

    /// Value at `idx` as an integer.
    ///
    /// Text is parsed; text that is not numeric is a type mismatch.
    pub fn to_int(&self, idx: usize) -> Result<i32> {
        self.check_index(idx)?;
        match &self.values {
            MetaDataValues::Char(rows) => {
                let text = rows[idx].trim();
                text.parse::<i32>()
                    .or_else(|_| text.parse::<f64>().map(|v| v as i32))
                    .map_err(|_| {
                        MocapError::TypeMismatch(format!("'{}' is not an integer", text))
                    })
            }
            MetaDataValues::Byte(v) => Ok(v[idx] as i32),
            MetaDataValues::Integer(v) => Ok(v[idx] as i32),
            MetaDataValues::Real(v) => Ok(v[idx] as i32),
        }
    }

    pub fn to_double(&self, idx: usize) -> Result<f64> {
        self.check_index(idx)?;
        match &self.values {
            MetaDataValues::Char(rows) => {
                let text = rows[idx].trim();
                text.parse::<f64>()
                    .map_err(|_| MocapError::TypeMismatch(format!("'{}' is not a number", text)))
            }
            MetaDataValues::Byte(v) => Ok(v[idx] as f64),
            MetaDataValues::Integer(v) => Ok(v[idx] as f64),
            MetaDataValues::Real(v) => Ok(v[idx] as f64),
        }
    }

    /// Value at `idx` as text
    pub fn to_text(&self, idx: usize) -> Result<String> {
        self.check_index(idx)?;
        Ok(match &self.values {
            MetaDataValues::Char(rows) => rows[idx].clone(),
            MetaDataValues::Byte(v) => v[idx].to_string(),
            MetaDataValues::Integer(v) => v[idx].to_string(),
            MetaDataValues::Real(v) => v[idx].to_string(),
        })
    }

    pub fn to_ints(&self) -> Result<Vec<i32>> {
        (0..self.len()).map(|i| self.to_int(i)).collect()
    }

    pub fn to_doubles(&self) -> Result<Vec<f64>> {
        (0..self.len()).map(|i| self.to_double(i)).collect()
    }

    pub fn to_strings(&self) -> Vec<String> {
        (0..self.len())
            .filter_map(|i| self.to_text(i).ok())
            .collect()
    }

    /// Borrow text rows; any other format is a type mismatch
    pub fn as_strings(&self) -> Result<&[String]> {
        match &self.values {
            MetaDataValues::Char(v) => Ok(v),
            _ => Err(self.mismatch(MetaDataFormat::Char)),
        }
    }

    pub fn as_i8s(&self) -> Result<&[i8]> {
        match &self.values {
            MetaDataValues::Byte(v) => Ok(v),
            _ => Err(self.mismatch(MetaDataFormat::Byte)),
        }
    }

    pub fn as_i16s(&self) -> Result<&[i16]> {
        match &self.values {
            MetaDataValues::Integer(v) => Ok(v),
            _ => Err(self.mismatch(MetaDataFormat::Integer)),
        }
    }

    pub fn as_f32s(&self) -> Result<&[f32]> {
        match &self.values {
            MetaDataValues::Real(v) => Ok(v),
            _ => Err(self.mismatch(MetaDataFormat::Real)),
        }
    }

    fn mismatch(&self, requested: MetaDataFormat) -> MocapError {
        MocapError::TypeMismatch(format!(
            "{} requested from {} values",
            requested,
            self.format()
        ))
    }
}

impl From<&str> for MetaDataInfo {
    fn from(value: &str) -> Self {
        MetaDataInfo::from_text(value)
    }
}

impl From<i16> for MetaDataInfo {
    fn from(value: i16) -> Self {
        MetaDataInfo::from_i16(value)
    }
}

impl From<f32> for MetaDataInfo {
    fn from(value: f32) -> Self {
        MetaDataInfo::from_f32(value)
    }
}
