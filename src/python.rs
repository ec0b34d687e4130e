//! Python bindings

use std::sync::Arc;

use http::Method;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::batch::{
    generate_batch as generate, parse_batch_with_config, BatchRequestItem, BatchResponseItem,
    Headers, MultipartMixed,
};
use crate::config::{self, CoreConfig};
use crate::fiql;
use crate::search;

// ============================================================================
// Cached Configuration
// ============================================================================

/// Global cached configuration
static CACHED_CONFIG: OnceCell<Arc<RwLock<CoreConfig>>> = OnceCell::new();

/// Cached configuration, or the defaults when `init_config` was never called
fn current_config() -> CoreConfig {
    CACHED_CONFIG
        .get()
        .map(|cached| cached.read().clone())
        .unwrap_or_default()
}

fn to_json<T: serde::Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| PyValueError::new_err(e.to_string()))
}

// ============================================================================
// Batch Items
// ============================================================================

/// A parsed or to-be-generated batch item
///
/// Requests carry `method`, `request_uri` and `query_string`; responses carry `status`.
#[pyclass(name = "BatchItem", get_all, set_all)]
#[derive(Debug, Clone, Default)]
pub struct PyBatchItem {
    method: Option<String>,
    request_uri: Option<String>,
    query_string: Option<String>,
    status: Option<u16>,
    headers: Vec<(String, Vec<String>)>,
    content: String,
}

#[pymethods]
impl PyBatchItem {
    #[new]
    #[pyo3(signature = (method=None, request_uri=None, query_string=None, status=None, headers=None, content=String::new()))]
    fn new(
        method: Option<String>,
        request_uri: Option<String>,
        query_string: Option<String>,
        status: Option<u16>,
        headers: Option<Vec<(String, Vec<String>)>>,
        content: String,
    ) -> Self {
        Self {
            method,
            request_uri,
            query_string,
            status,
            headers: headers.unwrap_or_default(),
            content,
        }
    }

    fn __repr__(&self) -> String {
        match (&self.method, self.status) {
            (_, Some(status)) => format!("BatchItem(status={})", status),
            (Some(method), None) => format!(
                "BatchItem(method={}, request_uri={})",
                method,
                self.request_uri.as_deref().unwrap_or("")
            ),
            (None, None) => "BatchItem()".to_string(),
        }
    }
}

fn headers_to_py(headers: &Headers) -> Vec<(String, Vec<String>)> {
    headers
        .iter()
        .map(|(name, values)| (name.to_string(), values.to_vec()))
        .collect()
}

fn headers_from_py(pairs: &[(String, Vec<String>)]) -> Headers {
    let mut headers = Headers::new();
    for (name, values) in pairs {
        for value in values {
            headers.append(name, value);
        }
    }
    headers
}

impl From<BatchRequestItem> for PyBatchItem {
    fn from(item: BatchRequestItem) -> Self {
        Self {
            method: item.method.map(|m| m.to_string()),
            request_uri: item.request_uri,
            query_string: item.query_string,
            status: None,
            headers: headers_to_py(&item.headers),
            content: item.content,
        }
    }
}

impl From<BatchResponseItem> for PyBatchItem {
    fn from(item: BatchResponseItem) -> Self {
        Self {
            status: item.status,
            headers: headers_to_py(&item.headers),
            content: item.content,
            ..Self::default()
        }
    }
}

impl PyBatchItem {
    fn to_request(&self) -> PyResult<BatchRequestItem> {
        let method = self
            .method
            .as_deref()
            .map(|m| Method::from_bytes(m.as_bytes()))
            .transpose()
            .map_err(|e| PyValueError::new_err(format!("Invalid method: {}", e)))?;
        Ok(BatchRequestItem {
            method,
            request_uri: self.request_uri.clone(),
            query_string: self.query_string.clone(),
            headers: headers_from_py(&self.headers),
            content: self.content.clone(),
        })
    }

    fn to_response(&self) -> BatchResponseItem {
        BatchResponseItem {
            status: self.status,
            headers: headers_from_py(&self.headers),
            content: self.content.clone(),
        }
    }
}

/// Parse on the calling thread; shared by the sync and async entry points
fn parse_items(payload: &[u8], content_type: &str, responses: bool) -> PyResult<Vec<PyBatchItem>> {
    let media = MultipartMixed::parse(content_type)?;
    let batch_config = current_config().batch;

    let items = if responses {
        parse_batch_with_config(payload, &media, &BatchResponseItem::default(), &batch_config)?
            .into_iter()
            .map(PyBatchItem::from)
            .collect()
    } else {
        parse_batch_with_config(payload, &media, &BatchRequestItem::default(), &batch_config)?
            .into_iter()
            .map(PyBatchItem::from)
            .collect()
    };
    Ok(items)
}

// ============================================================================
// Python Functions
// ============================================================================

/// Initialize the configuration (call once at startup)
///
/// # Arguments
/// * `config` - Optional dict: {"search": {"any_fields": [...]}, "batch": {"buffer_size": int, "default_charset": str}}
#[pyfunction]
#[pyo3(signature = (config=None))]
fn init_config(config: Option<&Bound<'_, PyDict>>) -> PyResult<()> {
    let cached = match config {
        Some(dict) => config::deserialize_config(dict)?,
        None => CoreConfig::default(),
    };

    // If already initialized, update the config
    if let Some(existing) = CACHED_CONFIG.get() {
        let mut guard = existing.write();
        *guard = cached;
    } else {
        let _ = CACHED_CONFIG.set(Arc::new(RwLock::new(cached)));
    }

    Ok(())
}

/// Check if config is initialized
#[pyfunction]
fn is_config_initialized() -> bool {
    CACHED_CONFIG.get().is_some()
}

/// Translate a decoded FIQL expression into a connector filter (JSON)
///
/// Parsed expressions go through the bounded process-wide cache.
///
/// # Raises
/// ValueError with the expression and the root cause when translation fails
#[pyfunction]
fn convert_to_filter(fiql: &str) -> PyResult<String> {
    let (filter, _) = search::convert_to_filter_cached(fiql)?;
    to_json(&filter)
}

/// Translate into a connector filter (JSON) plus the attribute names it references
#[pyfunction]
fn convert_to_filter_with_attributes(fiql: &str) -> PyResult<(String, Vec<String>)> {
    let (filter, attributes) = search::convert_to_filter_cached(fiql)?;
    Ok((to_json(&filter)?, attributes.into_iter().collect()))
}

/// Translate a raw FIQL expression into a search condition (JSON)
///
/// # Arguments
/// * `fiql` - FIQL expression, values still form-encoded
/// * `realm` - Realm full path used by `$assignable`
#[pyfunction]
#[pyo3(signature = (fiql, realm=None))]
fn convert_to_search_cond(fiql: &str, realm: Option<&str>) -> PyResult<String> {
    let search_config = current_config().search;
    let cond = search::convert_to_search_cond_cached(fiql, realm, &search_config)?;
    to_json(&cond)
}

/// Parse a batch payload
///
/// # Arguments
/// * `payload` - Raw multipart body
/// * `content_type` - The `multipart/mixed;boundary=...` Content-Type of the body
/// * `responses` - Read parts as responses instead of requests
///
/// # Raises
/// RuntimeError when the close delimiter is missing
#[pyfunction]
#[pyo3(signature = (payload, content_type, responses=false))]
fn parse_batch(payload: &[u8], content_type: &str, responses: bool) -> PyResult<Vec<PyBatchItem>> {
    parse_items(payload, content_type, responses)
}

/// Parse a batch payload asynchronously
///
/// Runs in a background thread using Tokio's spawn_blocking, keeping
/// Python's asyncio event loop responsive.
///
/// # Example (Python)
/// ```python
/// items = await parse_batch_async(body, "multipart/mixed;boundary=batch_1")
/// print(items[0].method)
/// ```
#[pyfunction]
#[pyo3(signature = (payload, content_type, responses=false))]
fn parse_batch_async<'py>(
    py: Python<'py>,
    payload: Vec<u8>,
    content_type: String,
    responses: bool,
) -> PyResult<Bound<'py, PyAny>> {
    pyo3_async_runtimes::tokio::future_into_py(py, async move {
        let items = tokio::task::spawn_blocking(move || {
            parse_items(&payload, &content_type, responses)
        })
        .await
        .map_err(|e| PyRuntimeError::new_err(format!("Batch parse task panicked: {}", e)))??;

        Ok(items)
    })
}

/// Generate a batch payload
///
/// Items are written as responses when any of them has a status, as requests otherwise.
///
/// # Returns
/// (content_type, payload)
#[pyfunction]
#[pyo3(signature = (items, boundary=None))]
fn generate_batch(items: Vec<PyBatchItem>, boundary: Option<&str>) -> PyResult<(String, String)> {
    let media = boundary.map_or_else(MultipartMixed::random, MultipartMixed::new);

    let payload = if items.iter().any(|item| item.status.is_some()) {
        let responses: Vec<BatchResponseItem> = items.iter().map(PyBatchItem::to_response).collect();
        generate(&responses, &media)
    } else {
        let requests = items
            .iter()
            .map(PyBatchItem::to_request)
            .collect::<PyResult<Vec<_>>>()?;
        generate(&requests, &media)
    };

    Ok((media.content_type(), payload))
}

/// Fresh random boundary parameter
#[pyfunction]
fn random_boundary() -> String {
    MultipartMixed::random().boundary().to_string()
}

/// Clear the parsed-expression cache
#[pyfunction]
fn clear_cache() {
    fiql::clear_cache();
}

/// Number of cached parsed expressions, at most `MAX_CACHED_EXPRESSIONS`
#[pyfunction]
fn cache_size() -> usize {
    fiql::cache_size()
}

// ============================================================================
// Python Module Definition
// ============================================================================

/// Python module definition
#[pymodule]
fn search_batch_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(init_config, m)?)?;
    m.add_function(wrap_pyfunction!(is_config_initialized, m)?)?;
    m.add_function(wrap_pyfunction!(convert_to_filter, m)?)?;
    m.add_function(wrap_pyfunction!(convert_to_filter_with_attributes, m)?)?;
    m.add_function(wrap_pyfunction!(convert_to_search_cond, m)?)?;
    m.add_function(wrap_pyfunction!(parse_batch, m)?)?;
    m.add_function(wrap_pyfunction!(parse_batch_async, m)?)?;
    m.add_function(wrap_pyfunction!(generate_batch, m)?)?;
    m.add_function(wrap_pyfunction!(random_boundary, m)?)?;
    m.add_function(wrap_pyfunction!(clear_cache, m)?)?;
    m.add_function(wrap_pyfunction!(cache_size, m)?)?;
    m.add_class::<PyBatchItem>()?;
    Ok(())
}
