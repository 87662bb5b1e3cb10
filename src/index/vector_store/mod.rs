
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
    UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::embeddings::chunking::Chunk;
use crate::{RagError, Result};

const TABLE_NAME: &str = "chunks";

/// LanceDB table of chunks and their embeddings, searched by cosine distance
pub struct VectorStore {
    table: Table,
    vector_dimension: usize,
    row_count: usize,
}

/// A chunk returned by similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Cosine distance to the query, lower is closer
    pub distance: f32,
}

impl VectorStore {
    /// Create an empty store in `path`, which must not already hold one
    #[inline]
    pub async fn create(path: &Path, vector_dimension: usize) -> Result<Self> {
        debug!("Creating LanceDB table at path: {:?}", path);

        std::fs::create_dir_all(path).map_err(|e| {
            RagError::Index(format!("Failed to create vector database directory: {}", e))
        })?;

        let connection = connect(path).await?;
        let table = connection
            .create_empty_table(TABLE_NAME, create_schema(vector_dimension)?)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to create table: {}", e)))?;

        Ok(Self {
            table,
            vector_dimension,
            row_count: 0,
        })
    }

    /// Open an existing store, detecting the vector dimension from its schema
    #[inline]
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(RagError::Index(format!(
                "Vector database not found at {}",
                path.display()
            )));
        }

        let connection = connect(path).await?;
        let table = connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to open table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Index(format!("Failed to get table schema: {}", e)))?;

        let vector_dimension = schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                RagError::Index("Could not find vector column or determine dimension".to_string())
            })?;

        let row_count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Index(format!("Failed to count rows: {}", e)))?;

        debug!(
            "Opened vector store with {} rows of dimension {}",
            row_count, vector_dimension
        );

        Ok(Self {
            table,
            vector_dimension,
            row_count,
        })
    }

    #[inline]
    pub fn vector_dimension(&self) -> usize {
        self.vector_dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.row_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Append chunks with their embeddings; `vectors[i]` belongs to `chunks[i]`
    #[inline]
    pub async fn add_chunks(&mut self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(RagError::Index(format!(
                "Mismatch between chunk and vector counts: {} vs {}",
                chunks.len(),
                vectors.len()
            )));
        }
        if chunks.is_empty() {
            debug!("No chunks to store");
            return Ok(());
        }

        let record_batch = self.create_record_batch(chunks, vectors)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        self.table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to insert chunks: {}", e)))?;

        self.row_count += chunks.len();
        info!("Stored {} chunks", chunks.len());
        Ok(())
    }

    fn create_record_batch(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<RecordBatch> {
        let len = chunks.len();
        let dimension = self.vector_dimension;

        let mut flat_values = Vec::with_capacity(len * dimension);
        for vector in vectors {
            if vector.len() != dimension {
                return Err(RagError::Index(format!(
                    "Embedding has {} dimensions, table expects {}",
                    vector.len(),
                    dimension
                )));
            }
            flat_values.extend_from_slice(vector);
        }

        let ids: Vec<String> = (0..len).map(|_| uuid::Uuid::new_v4().to_string()).collect();
        let sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
        let page_numbers: Vec<u32> = chunks.iter().map(|c| c.page_number).collect();
        let chunk_indices = chunks
            .iter()
            .map(|c| u32::try_from(c.chunk_index))
            .collect::<std::result::Result<Vec<u32>, _>>()
            .map_err(|e| RagError::Index(format!("Chunk index out of range: {}", e)))?;
        let offsets: Vec<u64> = chunks.iter().map(|c| c.offset as u64).collect();
        let contents: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            list_size(dimension)?,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| RagError::Index(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(sources)),
            Arc::new(UInt32Array::from(page_numbers)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(UInt64Array::from(offsets)),
            Arc::new(StringArray::from(contents)),
        ];

        RecordBatch::try_new(create_schema(dimension)?, arrays)
            .map_err(|e| RagError::Index(format!("Failed to create record batch: {}", e)))
    }

    /// The `limit` nearest chunks to `query_vector`, closest first
    #[inline]
    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if limit == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        if query_vector.len() != self.vector_dimension {
            return Err(RagError::Index(format!(
                "Query has {} dimensions, index expects {}",
                query_vector.len(),
                self.vector_dimension
            )));
        }

        debug!("Searching for similar vectors with limit: {}", limit);

        let mut results = self
            .table
            .vector_search(query_vector)
            .map_err(|e| RagError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to execute search: {}", e)))?;

        let mut search_results = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Index(format!("Failed to read result stream: {}", e)))?
        {
            search_results.extend(parse_search_batch(&batch)?);
        }

        search_results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        debug!("Found {} search results", search_results.len());
        Ok(search_results)
    }
}

async fn connect(path: &Path) -> Result<lancedb::Connection> {
    let uri = format!("file://{}", path.display());
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| RagError::Index(format!("Failed to connect to LanceDB: {}", e)))
}

fn list_size(dimension: usize) -> Result<i32> {
    i32::try_from(dimension)
        .map_err(|_| RagError::Index(format!("Vector dimension too large: {}", dimension)))
}

fn create_schema(vector_dimension: usize) -> Result<Arc<Schema>> {
    Ok(Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                list_size(vector_dimension)?,
            ),
            false,
        ),
        Field::new("source", DataType::Utf8, false),
        Field::new("page_number", DataType::UInt32, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("offset", DataType::UInt64, false),
        Field::new("content", DataType::Utf8, false),
    ])))
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| RagError::Index(format!("Invalid {} column type", name)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let sources = column::<StringArray>(batch, "source")?;
    let page_numbers = column::<UInt32Array>(batch, "page_number")?;
    let chunk_indices = column::<UInt32Array>(batch, "chunk_index")?;
    let offsets = column::<UInt64Array>(batch, "offset")?;
    let contents = column::<StringArray>(batch, "content")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut results = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let distance = distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        results.push(SearchResult {
            chunk: Chunk {
                text: contents.value(row).to_string(),
                source: sources.value(row).to_string(),
                page_number: page_numbers.value(row),
                offset: usize::try_from(offsets.value(row)).unwrap_or(usize::MAX),
                chunk_index: chunk_indices.value(row) as usize,
            },
            distance,
        });
    }

    Ok(results)
}
