use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use thiserror::Error;

use super::BucketType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("bucket {0} already exists")]
    BucketAlreadyExists(String),

    #[error("bucket {0} does not exist")]
    NoSuchBucket(String),

    #[error("key {key} not found in bucket {bucket}")]
    NoSuchKey { bucket: String, key: String },

    #[error("bucket {0} is not empty")]
    BucketNotEmpty(String),

    #[error("transient failure during {0}")]
    Transient(&'static str),
}

impl StoreError {
    /// Only injected transport faults are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Outcome of one call attempt plus the latency the transport observed.
#[derive(Debug)]
pub struct Timed<T> {
    pub result: Result<T, StoreError>,
    pub latency_ms: f64,
}

// ─── Latency model ───────────────────────────────────────────────

/// Simulated request latency: a fixed base per bucket type, a per-KiB
/// transfer cost, and ± `jitter` proportional noise.
#[derive(Debug, Clone, Copy)]
pub struct LatencyModel {
    pub standard_base_ms: f64,
    pub express_base_ms: f64,
    pub standard_per_kib_ms: f64,
    pub express_per_kib_ms: f64,
    /// 0.2 = ±20 %
    pub jitter: f64,
}

impl Default for LatencyModel {
    fn default() -> Self {
        Self {
            standard_base_ms: 8.0,
            express_base_ms: 2.0,
            standard_per_kib_ms: 0.02,
            express_per_kib_ms: 0.01,
            jitter: 0.2,
        }
    }
}

impl LatencyModel {
    fn sample(&self, rng: &mut StdRng, bucket_type: BucketType, bytes: usize) -> f64 {
        let kib = bytes as f64 / 1024.0;
        let nominal = match bucket_type {
            BucketType::Standard => self.standard_base_ms + kib * self.standard_per_kib_ms,
            BucketType::Express => self.express_base_ms + kib * self.express_per_kib_ms,
        };
        let noise = if self.jitter > 0.0 {
            rng.gen_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        (nominal * (1.0 + noise)).max(0.0)
    }
}

// ─── Store ───────────────────────────────────────────────────────

struct Bucket {
    bucket_type: BucketType,
    objects: HashMap<String, Arc<[u8]>>,
}

/// In-memory stand-in for a remote object store.
///
/// Every call samples a latency, optionally sleeps for it, and may fail
/// with a retryable [`StoreError::Transient`] at `failure_rate`. Faults hit
/// every operation unless narrowed with `with_fault_operations`.
pub struct SimulatedObjectStore {
    buckets: Mutex<HashMap<String, Bucket>>,
    rng: Mutex<StdRng>,
    latency: LatencyModel,
    failure_rate: f64,
    fault_operations: Option<HashSet<String>>,
    realtime: bool,
}

impl SimulatedObjectStore {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            rng: Mutex::new(StdRng::from_entropy()),
            latency: LatencyModel::default(),
            failure_rate: 0.0,
            fault_operations: None,
            realtime: true,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_latency_model(mut self, latency: LatencyModel) -> Self {
        self.latency = latency;
        self
    }

    /// Clamped to `[0, 1]`.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    /// Only these operations are subject to `failure_rate`.
    pub fn with_fault_operations<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fault_operations = Some(
            operations
                .into_iter()
                .map(|op| op.as_ref().trim().to_string())
                .collect(),
        );
        self
    }

    /// When false, latencies are reported but not slept.
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }

    pub fn object_count(&self, bucket: &str) -> Option<usize> {
        self.buckets.lock().get(bucket).map(|b| b.objects.len())
    }

    pub async fn create_bucket(&self, bucket: &str, bucket_type: BucketType) -> Timed<()> {
        let (latency_ms, fault) = self.attempt("CreateBucket", bucket_type, 0);
        self.settle(latency_ms).await;
        if let Some(e) = fault {
            return Timed { result: Err(e), latency_ms };
        }

        let mut buckets = self.buckets.lock();
        let result = if buckets.contains_key(bucket) {
            Err(StoreError::BucketAlreadyExists(bucket.to_string()))
        } else {
            buckets.insert(
                bucket.to_string(),
                Bucket {
                    bucket_type,
                    objects: HashMap::new(),
                },
            );
            Ok(())
        };
        Timed { result, latency_ms }
    }

    pub async fn put_object(&self, bucket: &str, key: &str, body: Arc<[u8]>) -> Timed<()> {
        let bucket_type = match self.bucket_type(bucket) {
            Ok(t) => t,
            Err(e) => return Timed { result: Err(e), latency_ms: 0.0 },
        };
        let (latency_ms, fault) = self.attempt("PutObject", bucket_type, body.len());
        self.settle(latency_ms).await;
        if let Some(e) = fault {
            return Timed { result: Err(e), latency_ms };
        }

        let result = match self.buckets.lock().get_mut(bucket) {
            Some(b) => {
                b.objects.insert(key.to_string(), body);
                Ok(())
            }
            None => Err(StoreError::NoSuchBucket(bucket.to_string())),
        };
        Timed { result, latency_ms }
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> Timed<Arc<[u8]>> {
        let (bucket_type, size) = {
            let buckets = self.buckets.lock();
            match buckets.get(bucket) {
                Some(b) => (b.bucket_type, b.objects.get(key).map_or(0, |o| o.len())),
                None => {
                    return Timed {
                        result: Err(StoreError::NoSuchBucket(bucket.to_string())),
                        latency_ms: 0.0,
                    }
                }
            }
        };
        let (latency_ms, fault) = self.attempt("GetObject", bucket_type, size);
        self.settle(latency_ms).await;
        if let Some(e) = fault {
            return Timed { result: Err(e), latency_ms };
        }

        let result = match self.buckets.lock().get(bucket) {
            Some(b) => b.objects.get(key).cloned().ok_or_else(|| StoreError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            None => Err(StoreError::NoSuchBucket(bucket.to_string())),
        };
        Timed { result, latency_ms }
    }

    /// Deleting a missing key succeeds, as object stores do.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Timed<()> {
        let bucket_type = match self.bucket_type(bucket) {
            Ok(t) => t,
            Err(e) => return Timed { result: Err(e), latency_ms: 0.0 },
        };
        let (latency_ms, fault) = self.attempt("DeleteObject", bucket_type, 0);
        self.settle(latency_ms).await;
        if let Some(e) = fault {
            return Timed { result: Err(e), latency_ms };
        }

        let result = match self.buckets.lock().get_mut(bucket) {
            Some(b) => {
                b.objects.remove(key);
                Ok(())
            }
            None => Err(StoreError::NoSuchBucket(bucket.to_string())),
        };
        Timed { result, latency_ms }
    }

    pub async fn delete_bucket(&self, bucket: &str) -> Timed<()> {
        let bucket_type = match self.bucket_type(bucket) {
            Ok(t) => t,
            Err(e) => return Timed { result: Err(e), latency_ms: 0.0 },
        };
        let (latency_ms, fault) = self.attempt("DeleteBucket", bucket_type, 0);
        self.settle(latency_ms).await;
        if let Some(e) = fault {
            return Timed { result: Err(e), latency_ms };
        }

        let mut buckets = self.buckets.lock();
        let result = match buckets.get(bucket).map(|b| b.objects.is_empty()) {
            Some(false) => Err(StoreError::BucketNotEmpty(bucket.to_string())),
            Some(true) => {
                buckets.remove(bucket);
                Ok(())
            }
            None => Err(StoreError::NoSuchBucket(bucket.to_string())),
        };
        Timed { result, latency_ms }
    }

    fn bucket_type(&self, bucket: &str) -> Result<BucketType, StoreError> {
        self.buckets
            .lock()
            .get(bucket)
            .map(|b| b.bucket_type)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))
    }

    /// Sample latency and decide whether this attempt faults.
    fn attempt(
        &self,
        operation: &'static str,
        bucket_type: BucketType,
        bytes: usize,
    ) -> (f64, Option<StoreError>) {
        let mut rng = self.rng.lock();
        let latency_ms = self.latency.sample(&mut rng, bucket_type, bytes);
        let eligible = self
            .fault_operations
            .as_ref()
            .map_or(true, |ops| ops.contains(operation));
        let fault = (eligible && self.failure_rate > 0.0 && rng.gen_bool(self.failure_rate))
            .then_some(StoreError::Transient(operation));
        (latency_ms, fault)
    }

    async fn settle(&self, latency_ms: f64) {
        if self.realtime && latency_ms > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(latency_ms / 1000.0)).await;
        }
    }
}

impl Default for SimulatedObjectStore {
    fn default() -> Self {
        Self::new()
    }
}
