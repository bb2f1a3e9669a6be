use std::fmt;

use super::error::{RecordError, RecordResult};
use super::schema::Schema;
use super::value::Value;
use crate::storage::PageId;

/// Physical identifier for a record: data page plus slot index.
/// Stable for the record's lifetime; records are never moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    pub page: PageId,
    pub slot: usize,
}

impl Rid {
    pub fn new(page: PageId, slot: usize) -> Self {
        Self { page, slot }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page, self.slot)
    }
}

/// A single row: the raw payload bytes in schema layout, plus the rid it was
/// read from (absent until the record is stored).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: Option<Rid>,
    pub data: Vec<u8>,
}

impl Record {
    /// Fresh zeroed record sized for `schema`
    pub fn new(schema: &Schema) -> Self {
        Self {
            id: None,
            data: vec![0u8; schema.record_size()],
        }
    }

    /// Build a record by setting every attribute in order.
    pub fn from_values(schema: &Schema, values: &[Value]) -> RecordResult<Self> {
        if values.len() != schema.num_attrs() {
            return Err(RecordError::WrongValueCount {
                expected: schema.num_attrs(),
                actual: values.len(),
            });
        }
        let mut record = Self::new(schema);
        for (i, value) in values.iter().enumerate() {
            record.set_attr(schema, i, value)?;
        }
        Ok(record)
    }

    /// Decode attribute `index` from the payload.
    pub fn get_attr(&self, schema: &Schema, index: usize) -> RecordResult<Value> {
        let attr = schema.attr(index)?;
        let offset = schema.attr_offset(index);
        let size = attr.data_type.size();
        Value::read_from(&attr.data_type, &self.data[offset..offset + size])
    }

    /// Encode `value` into attribute `index` of the payload.
    pub fn set_attr(&mut self, schema: &Schema, index: usize, value: &Value) -> RecordResult<()> {
        let attr = schema.attr(index)?;
        let offset = schema.attr_offset(index);
        let size = attr.data_type.size();
        value.write_to(&attr.data_type, &mut self.data[offset..offset + size])
    }

    /// Decode every attribute in schema order.
    pub fn values(&self, schema: &Schema) -> RecordResult<Vec<Value>> {
        (0..schema.num_attrs())
            .map(|i| self.get_attr(schema, i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::schema::Attribute;
    use crate::record::value::DataType;

    fn sample_schema() -> Schema {
        Schema::new(
            vec![
                Attribute::new("id", DataType::Int),
                Attribute::new("name", DataType::Text(8)),
                Attribute::new("score", DataType::Float),
                Attribute::new("active", DataType::Bool),
            ],
            vec![0],
        )
        .unwrap()
    }

    #[test]
    fn test_new_record_is_zeroed() {
        let schema = sample_schema();
        let record = Record::new(&schema);
        assert_eq!(record.id, None);
        assert_eq!(record.data.len(), schema.record_size());
        assert!(record.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_set_get_round_trip() {
        let schema = sample_schema();
        let mut record = Record::new(&schema);

        record.set_attr(&schema, 0, &Value::Int(7)).unwrap();
        record.set_attr(&schema, 1, &Value::from("alice")).unwrap();
        record.set_attr(&schema, 2, &Value::Float(95.5)).unwrap();
        record.set_attr(&schema, 3, &Value::Bool(true)).unwrap();

        assert_eq!(record.get_attr(&schema, 0).unwrap(), Value::Int(7));
        assert_eq!(record.get_attr(&schema, 1).unwrap(), Value::from("alice"));
        assert_eq!(record.get_attr(&schema, 2).unwrap(), Value::Float(95.5));
        assert_eq!(record.get_attr(&schema, 3).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_set_attr_does_not_disturb_neighbours() {
        let schema = sample_schema();
        let mut record = Record::new(&schema);
        record.set_attr(&schema, 0, &Value::Int(1)).unwrap();
        record.set_attr(&schema, 1, &Value::from("bob")).unwrap();

        record.set_attr(&schema, 0, &Value::Int(2)).unwrap();
        assert_eq!(record.get_attr(&schema, 1).unwrap(), Value::from("bob"));
    }

    #[test]
    fn test_from_values() {
        let schema = sample_schema();
        let record = Record::from_values(
            &schema,
            &[
                Value::Int(3),
                Value::from("carol"),
                Value::Float(1.25),
                Value::Bool(false),
            ],
        )
        .unwrap();

        assert_eq!(
            record.values(&schema).unwrap(),
            vec![
                Value::Int(3),
                Value::from("carol"),
                Value::Float(1.25),
                Value::Bool(false),
            ]
        );
    }

    #[test]
    fn test_from_values_arity_mismatch() {
        let schema = sample_schema();
        let result = Record::from_values(&schema, &[Value::Int(3)]);
        assert!(matches!(
            result,
            Err(RecordError::WrongValueCount {
                expected: 4,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_set_attr_type_mismatch() {
        let schema = sample_schema();
        let mut record = Record::new(&schema);
        let result = record.set_attr(&schema, 0, &Value::from("not an int"));
        assert!(matches!(result, Err(RecordError::TypeMismatch { .. })));
    }

    #[test]
    fn test_attr_index_out_of_range() {
        let schema = sample_schema();
        let record = Record::new(&schema);
        assert!(matches!(
            record.get_attr(&schema, 4),
            Err(RecordError::AttrOutOfRange { index: 4, count: 4 })
        ));
    }

    #[test]
    fn test_rid_display() {
        let rid = Rid::new(3, 12);
        assert_eq!(rid.to_string(), "(3, 12)");
    }
}
