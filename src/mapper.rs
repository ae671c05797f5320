//! Row-to-entity mapping.
//!
//! Mapping is a plain function from a [`Row`] to the caller's entity type,
//! applied to a single row, a materialized slice, or a live stream. A
//! missing row maps to the entity's `Default` value rather than an error:
//! reads are best-effort, and absence is an ordinary outcome.
//!
//! [`EntityMapper`] packages the same operations around a stored closure for
//! callers that reuse one mapping in many places.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::traits::{Row, RowStream};

/// Map a single optional row, defaulting when it is absent.
pub fn read_row<T, F>(row: Option<&Row>, make: F) -> T
where
    T: Default,
    F: FnOnce(&Row) -> T,
{
    match row {
        Some(row) => make(row),
        None => T::default(),
    }
}

/// Map a slice of rows, preserving order and length.
pub fn read_rows<T, F>(rows: &[Row], mut make: F) -> Vec<T>
where
    F: FnMut(&Row) -> T,
{
    rows.iter().map(|row| make(row)).collect()
}

/// Advance a row stream by one and map the row.
///
/// Returns the entity default when the cursor is exhausted. A provider error
/// on the stream propagates unchanged.
pub async fn read_next<T, F>(stream: &mut RowStream, make: F) -> Result<T>
where
    T: Default,
    F: FnOnce(&Row) -> T,
{
    match stream.next().await {
        Some(Ok(row)) => Ok(make(&row)),
        Some(Err(e)) => Err(e),
        None => Ok(T::default()),
    }
}

/// Map every row of a stream lazily.
///
/// The result is as single-pass as its source: rows are pulled from the
/// underlying cursor only as the mapped stream is consumed.
pub fn map_stream<T, F>(stream: RowStream, mut make: F) -> BoxStream<'static, Result<T>>
where
    T: Send + 'static,
    F: FnMut(&Row) -> T + Send + 'static,
{
    stream.map(move |item| item.map(|row| make(&row))).boxed()
}

/// A reusable row mapping around a stored closure.
///
/// Carries no mutable state; cloning shares the closure.
pub struct EntityMapper<T> {
    make: Arc<dyn Fn(&Row) -> T + Send + Sync>,
}

impl<T> Clone for EntityMapper<T> {
    fn clone(&self) -> Self {
        Self {
            make: self.make.clone(),
        }
    }
}

impl<T> EntityMapper<T> {
    /// Create a mapper from a row transform.
    pub fn new(make: impl Fn(&Row) -> T + Send + Sync + 'static) -> Self {
        Self {
            make: Arc::new(make),
        }
    }

    /// Map a single optional row, defaulting when it is absent.
    pub fn map_row(&self, row: Option<&Row>) -> T
    where
        T: Default,
    {
        read_row(row, |r| (self.make)(r))
    }

    /// Map a slice of rows, preserving order and length.
    pub fn map_rows(&self, rows: &[Row]) -> Vec<T> {
        rows.iter().map(|row| (self.make)(row)).collect()
    }

    /// Map every row of a stream lazily.
    pub fn map_stream(&self, stream: RowStream) -> BoxStream<'static, Result<T>>
    where
        T: Send + 'static,
    {
        let make = self.make.clone();
        stream.map(move |item| item.map(|row| make(&row))).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::convert;
    use crate::traits::Value;
    use futures::stream;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        id: i64,
        name: String,
    }

    fn person(row: &Row) -> Person {
        Person {
            id: convert(row.get_or_null(0)),
            name: convert(row.get_or_null(1)),
        }
    }

    fn person_rows(n: i64) -> Vec<Row> {
        (0..n)
            .map(|i| {
                Row::from_values(vec![Value::Int64(i), Value::Text(format!("person-{i}"))])
            })
            .collect()
    }

    #[test]
    fn test_missing_row_maps_to_default() {
        let mapped = read_row(None, person);
        assert_eq!(mapped, Person::default());
    }

    #[test]
    fn test_rows_map_in_order() {
        let rows = person_rows(4);
        let mapped = read_rows(&rows, person);
        assert_eq!(mapped.len(), 4);
        for (i, p) in mapped.iter().enumerate() {
            assert_eq!(p.id, i as i64);
            assert_eq!(p.name, format!("person-{i}"));
        }
    }

    #[test]
    fn test_stream_mapping_is_single_pass() {
        smol::block_on(async {
            let source: RowStream =
                Box::pin(stream::iter(person_rows(3).into_iter().map(Ok)));
            let mut mapped = map_stream(source, person);

            let mut seen = Vec::new();
            while let Some(item) = mapped.next().await {
                seen.push(item.unwrap().id);
            }
            assert_eq!(seen, vec![0, 1, 2]);
            // The cursor is spent; pulling again yields nothing.
            assert!(mapped.next().await.is_none());
        });
    }

    #[test]
    fn test_read_next_defaults_on_exhausted_stream() {
        smol::block_on(async {
            let mut source: RowStream = Box::pin(stream::iter(
                person_rows(1).into_iter().map(Ok),
            ));
            let first = read_next(&mut source, person).await.unwrap();
            assert_eq!(first.id, 0);

            let second = read_next(&mut source, person).await.unwrap();
            assert_eq!(second, Person::default());
        });
    }

    #[test]
    fn test_entity_mapper_reuse() {
        let mapper = EntityMapper::new(person);
        let rows = person_rows(2);

        assert_eq!(mapper.map_row(rows.first()).name, "person-0");
        assert_eq!(mapper.map_row(None), Person::default());
        assert_eq!(mapper.map_rows(&rows).len(), 2);

        let cloned = mapper.clone();
        assert_eq!(cloned.map_rows(&rows)[1].name, "person-1");
    }

    #[test]
    fn test_stream_error_propagates() {
        smol::block_on(async {
            let source: RowStream = Box::pin(stream::iter(vec![
                Ok(Row::from_values(vec![Value::Int64(1)])),
                Err(crate::error::Error::NotConnected),
            ]));
            let mut mapped = map_stream(source, |row| convert::<i64>(row.get_or_null(0)));
            assert_eq!(mapped.next().await.unwrap().unwrap(), 1);
            assert!(mapped.next().await.unwrap().is_err());
        });
    }
}
