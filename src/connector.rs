//! Connector adapter
//!
//! Walks a [`RestApiClient`] until the endpoint is exhausted and hands out
//! the records one at a time. Dataset operations the host pipeline may call
//! but that a read-only REST source cannot provide are stubs.

use std::collections::VecDeque;

use log::info;
use serde_json::{Map, Value};

use crate::client::pagination::{split_path, value_at_path};
use crate::client::{ClientOptions, HttpTransport, RestApiClient};
use crate::config::ConnectorConfig;
use crate::constants::API_RESPONSE_KEY;
use crate::error::{ConfigError, Error, Result};

/// Read-only dataset backed by a REST endpoint
pub struct RestApiConnector<T: HttpTransport> {
    client: RestApiClient<T>,
}

impl<T: HttpTransport> RestApiConnector<T> {
    pub fn new(config: &ConnectorConfig, transport: T) -> Result<Self> {
        Self::with_options(config, transport, ClientOptions::default())
    }

    pub fn with_options(config: &ConnectorConfig, transport: T, options: ClientOptions) -> Result<Self> {
        let client = RestApiClient::with_options(&config.credential, &config.endpoint, transport, options)?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &RestApiClient<T> {
        &self.client
    }

    /// Records of the whole endpoint, in order.
    ///
    /// Paging restarts from the first page. Iteration ends after
    /// `records_limit` records when one is given, or at the first error.
    pub fn generate_rows(&mut self, records_limit: Option<usize>) -> Rows<'_, T> {
        info!("Generating rows (limit: {:?})", records_limit);
        self.client.start_paging();
        Rows {
            extraction_path: self.client.extraction_key().map(split_path),
            client: &mut self.client,
            buffer: VecDeque::new(),
            records_limit,
            emitted: 0,
            failed: false,
        }
    }

    /// Schema is never inferred.
    pub fn read_schema(&self) -> Option<Value> {
        None
    }

    pub fn list_partitions(&self) -> Vec<String> {
        Vec::new()
    }

    pub fn writer(&self) -> Result<()> {
        Err(Error::Unimplemented("writer"))
    }

    pub fn partitioning(&self) -> Result<Value> {
        Err(Error::Unimplemented("partitioning"))
    }

    pub fn partition_exists(&self, _partition: &str) -> Result<bool> {
        Err(Error::Unimplemented("partition_exists"))
    }

    pub fn records_count(&self) -> Result<u64> {
        Err(Error::Unimplemented("records_count"))
    }
}

/// Iterator over extracted records, see [`RestApiConnector::generate_rows`].
pub struct Rows<'a, T: HttpTransport> {
    client: &'a mut RestApiClient<T>,
    extraction_path: Option<Vec<String>>,
    buffer: VecDeque<Value>,
    records_limit: Option<usize>,
    emitted: usize,
    failed: bool,
}

impl<T: HttpTransport> Rows<'_, T> {
    fn limit_reached(&self) -> bool {
        self.records_limit.is_some_and(|limit| self.emitted >= limit)
    }

    fn extract(&self, response: Value) -> Result<Vec<Value>> {
        let data = match &self.extraction_path {
            Some(path) => value_at_path(&response, path.as_slice()).cloned().ok_or_else(|| {
                ConfigError::ExtractionKeyNotFound(path.join("."))
            })?,
            None => response,
        };
        Ok(into_records(data))
    }
}

impl<T: HttpTransport> Iterator for Rows<'_, T> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed || self.limit_reached() {
                return None;
            }
            if let Some(record) = self.buffer.pop_front() {
                self.emitted += 1;
                return Some(Ok(record));
            }
            if !self.client.has_more_data() {
                return None;
            }

            let page = self
                .client
                .paginated_api_call(true)
                .and_then(|response| self.extract(response));
            match page {
                Ok(records) => self.buffer.extend(records),
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Arrays yield their elements, objects one record, scalars are wrapped.
fn into_records(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        Value::Object(map) => vec![Value::Object(map)],
        scalar => {
            let mut wrapped = Map::new();
            wrapped.insert(API_RESPONSE_KEY.to_string(), scalar);
            vec![Value::Object(wrapped)]
        }
    }
}
