//! Record shape descriptors.
//!
//! A [`RecordLayout`] is a closed table of named fields, each a scalar or a
//! fixed-length array of one [`ScalarType`]. A [`FrameLayout`] combines a record
//! layout with the chunking parameters and fixes where every field's column
//! lives inside a frame's byte image:
//!
//! ```text
//! | field 0: N * w0 bytes | field 1: N * w1 bytes | ... | field k: N * wk bytes |
//! ```
//!
//! There is no padding between columns. Typed accessors check the requested
//! Rust type against the descriptor before touching any bytes.

use std::collections::HashSet;

use aosoa_common::{Result, error::Error, verify_arg};

use crate::config::SequenceConfig;

/// Element type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl ScalarType {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            ScalarType::U8 | ScalarType::I8 => 1,
            ScalarType::U16 | ScalarType::I16 => 2,
            ScalarType::U32 | ScalarType::I32 | ScalarType::F32 => 4,
            ScalarType::U64 | ScalarType::I64 | ScalarType::F64 => 8,
        }
    }
}

/// Rust types that can be read from and written to a field of the matching
/// [`ScalarType`].
pub trait Scalar: bytemuck::Pod {
    const SCALAR_TYPE: ScalarType;
}

macro_rules! impl_scalar {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Scalar for $t {
                const SCALAR_TYPE: ScalarType = ScalarType::$variant;
            }
        )*
    };
}

impl_scalar!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
);

/// Whether a field holds one element or a fixed-length array per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldShape {
    Scalar,
    Array(usize),
}

impl FieldShape {
    /// Number of elements per record.
    pub fn arity(self) -> usize {
        match self {
            FieldShape::Scalar => 1,
            FieldShape::Array(len) => len,
        }
    }
}

/// A named record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDef {
    name: String,
    scalar: ScalarType,
    shape: FieldShape,
}

impl FieldDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.scalar
    }

    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    /// Bytes occupied by this field in one record.
    pub fn width(&self) -> usize {
        self.scalar.size() * self.shape.arity()
    }
}

/// Position of a field within its [`RecordLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

impl FieldId {
    #[inline]
    pub(crate) fn from_index(index: usize) -> FieldId {
        FieldId(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// The field set of a record.
///
/// A record's *row image* is the concatenation of its field values in layout
/// order, `record_width()` bytes in total. Row images are what
/// [`push_row`](crate::sequence::ChunkedSequence::push_row) consumes and
/// [`read_row`](crate::sequence::ChunkedSequence::read_row) produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    fields: Vec<FieldDef>,
    /// Offset of each field within a row image.
    row_offsets: Vec<usize>,
    record_width: usize,
}

impl RecordLayout {
    pub fn builder() -> RecordLayoutBuilder {
        RecordLayoutBuilder::default()
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, id: FieldId) -> &FieldDef {
        &self.fields[id.0]
    }

    /// Looks up a field by name.
    pub fn field_id(&self, name: &str) -> Result<FieldId> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .map(FieldId)
            .ok_or_else(|| Error::invalid_arg("name", format!("no field named '{name}'")))
    }

    /// Byte width of one record (`E`).
    pub fn record_width(&self) -> usize {
        self.record_width
    }

    /// Byte range of the field within a row image.
    pub fn row_range(&self, id: FieldId) -> std::ops::Range<usize> {
        let start = self.row_offsets[id.0];
        start..start + self.fields[id.0].width()
    }

    /// Checks that `T` matches the element type of the field and, when
    /// `expect_scalar` is set, that the field is not an array.
    pub(crate) fn check_access<T: Scalar>(&self, id: FieldId, expect_scalar: bool) -> Result<()> {
        verify_arg!(field, id.0 < self.fields.len());
        let field = &self.fields[id.0];
        if field.scalar != T::SCALAR_TYPE {
            return Err(Error::invalid_arg(
                field.name.clone(),
                format!(
                    "field holds {:?} elements, accessed as {:?}",
                    field.scalar,
                    T::SCALAR_TYPE
                ),
            ));
        }
        if expect_scalar && field.shape != FieldShape::Scalar {
            return Err(Error::invalid_arg(
                field.name.clone(),
                "array field accessed as a scalar",
            ));
        }
        Ok(())
    }
}

/// Builder for [`RecordLayout`].
#[derive(Debug, Clone, Default)]
pub struct RecordLayoutBuilder {
    fields: Vec<FieldDef>,
}

impl RecordLayoutBuilder {
    /// Adds a scalar field.
    pub fn scalar(mut self, name: impl Into<String>, scalar: ScalarType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            scalar,
            shape: FieldShape::Scalar,
        });
        self
    }

    /// Adds a fixed-length array field.
    pub fn array(mut self, name: impl Into<String>, scalar: ScalarType, len: usize) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            scalar,
            shape: FieldShape::Array(len),
        });
        self
    }

    /// Validates the field set: at least one field, unique non-empty names,
    /// non-empty arrays.
    pub fn build(self) -> Result<RecordLayout> {
        verify_arg!(fields, !self.fields.is_empty());
        let mut names = HashSet::new();
        for field in &self.fields {
            verify_arg!(name, !field.name.is_empty());
            if !names.insert(field.name.as_str()) {
                return Err(Error::invalid_arg(
                    "name",
                    format!("duplicate field '{}'", field.name),
                ));
            }
            verify_arg!(shape, field.shape.arity() > 0);
        }

        let mut row_offsets = Vec::with_capacity(self.fields.len());
        let mut record_width = 0usize;
        for field in &self.fields {
            row_offsets.push(record_width);
            record_width = field
                .scalar
                .size()
                .checked_mul(field.shape.arity())
                .and_then(|width| record_width.checked_add(width))
                .ok_or_else(|| Error::invalid_arg("fields", "record width overflow"))?;
        }

        Ok(RecordLayout {
            fields: self.fields,
            row_offsets,
            record_width,
        })
    }
}

/// Placement of one field's column inside a frame image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    /// Byte offset of the column within the frame image.
    pub offset: usize,
    /// Bytes per record in this column.
    pub width: usize,
}

/// A record layout bound to a frame size: the complete description of a frame
/// image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    record: RecordLayout,
    frame_size: usize,
    alignment: usize,
    columns: Vec<ColumnSpan>,
    frame_bytes: usize,
}

impl FrameLayout {
    pub fn new(record: RecordLayout, config: &SequenceConfig) -> Result<FrameLayout> {
        config.validate()?;
        let frame_size = config.frame_size;
        let frame_bytes = record
            .record_width()
            .checked_mul(frame_size)
            .ok_or_else(|| Error::invalid_arg("frame_size", "frame byte size overflow"))?;

        let mut offset = 0;
        let columns = record
            .fields()
            .iter()
            .map(|field| {
                let span = ColumnSpan {
                    offset,
                    width: field.width(),
                };
                offset += field.width() * frame_size;
                span
            })
            .collect();

        Ok(FrameLayout {
            record,
            frame_size,
            alignment: config.alignment,
            columns,
            frame_bytes,
        })
    }

    pub fn record(&self) -> &RecordLayout {
        &self.record
    }

    /// Records per frame (`N`).
    #[inline]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Bytes per record (`E`).
    #[inline]
    pub fn record_width(&self) -> usize {
        self.record.record_width()
    }

    /// Bytes per frame image (`N * E`).
    #[inline]
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    #[inline]
    pub fn columns(&self) -> &[ColumnSpan] {
        &self.columns
    }

    #[inline]
    pub fn column(&self, id: FieldId) -> ColumnSpan {
        self.columns[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle() -> RecordLayout {
        RecordLayout::builder()
            .array("vel", ScalarType::F64, 3)
            .scalar("pos", ScalarType::F64)
            .scalar("flags", ScalarType::U8)
            .build()
            .unwrap()
    }

    #[test]
    fn test_record_layout() {
        let layout = particle();
        assert_eq!(layout.field_count(), 3);
        assert_eq!(layout.record_width(), 24 + 8 + 1);
        let pos = layout.field_id("pos").unwrap();
        assert_eq!(pos.index(), 1);
        assert_eq!(layout.row_range(pos), 24..32);
        assert_eq!(layout.field(pos).shape(), FieldShape::Scalar);
        assert!(layout.field_id("mass").is_err());
    }

    #[test]
    fn test_invalid_layouts() {
        assert!(RecordLayout::builder().build().is_err());
        assert!(
            RecordLayout::builder()
                .scalar("a", ScalarType::U32)
                .scalar("a", ScalarType::U64)
                .build()
                .is_err()
        );
        assert!(
            RecordLayout::builder()
                .array("v", ScalarType::F32, 0)
                .build()
                .is_err()
        );
        assert!(
            RecordLayout::builder()
                .scalar("", ScalarType::I8)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_check_access() {
        let layout = particle();
        let vel = layout.field_id("vel").unwrap();
        let pos = layout.field_id("pos").unwrap();
        assert!(layout.check_access::<f64>(pos, true).is_ok());
        assert!(layout.check_access::<f32>(pos, true).is_err());
        assert!(layout.check_access::<f64>(vel, true).is_err());
        assert!(layout.check_access::<f64>(vel, false).is_ok());
    }

    #[test]
    fn test_frame_layout_columns() {
        let config = SequenceConfig::default().with_frame_size(8);
        let frame = FrameLayout::new(particle(), &config).unwrap();
        assert_eq!(frame.frame_size(), 8);
        assert_eq!(frame.frame_bytes(), 33 * 8);
        assert_eq!(
            frame.columns(),
            &[
                ColumnSpan {
                    offset: 0,
                    width: 24
                },
                ColumnSpan {
                    offset: 192,
                    width: 8
                },
                ColumnSpan {
                    offset: 256,
                    width: 1
                },
            ]
        );
    }
}
