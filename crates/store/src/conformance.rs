//! Conformance test suite for `DeviceStore` implementations.
//!
//! A backend-agnostic battery any `DeviceStore` backend can run to
//! verify the contract the device subsystem depends on: upsert
//! identity, the full query-option matrix, and invalid-device
//! rejection.
//!
//! Backend crates call [`run_device_suite`] with a factory that
//! produces a fresh, empty store per test:
//!
//! ```ignore
//! let report = run_device_suite(|| async { create_test_store().await }).await;
//! assert_eq!(report.failed(), 0, "{report}");
//! ```

use std::fmt;
use std::future::Future;

use crate::error::StoreError;
use crate::query::DeviceQueryOptions;
use crate::record::{Device, Platform};
use crate::traits::DeviceStore;

const NS: &str = "app_1_1";

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: &'static str,
    pub passed: bool,
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(name: &'static str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => TestResult {
                name,
                passed: true,
                message: None,
            },
            Err(message) => TestResult {
                name,
                passed: false,
                message: Some(message),
            },
        }
    }
}

/// Aggregated outcome of a conformance run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
}

impl ConformanceReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|result| result.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "device store conformance: {} passed, {} failed",
            self.passed(),
            self.failed()
        )?;
        for result in self.results.iter().filter(|result| !result.passed) {
            writeln!(
                f,
                "  FAIL {}: {}",
                result.name,
                result.message.as_deref().unwrap_or("")
            )?;
        }
        Ok(())
    }
}

fn sample_device(device_id: &str, user_id: u64) -> Device {
    Device {
        device_id: device_id.to_string(),
        user_id,
        platform: Platform::Ios,
        token: format!("token-{device_id}-{user_id}"),
        language: "en".to_string(),
        endpoint_arn: None,
        deleted: false,
        disabled: false,
    }
}

/// Run the full suite against stores produced by `factory`.
pub async fn run_device_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: DeviceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "put_then_query_returns_device",
        put_then_query_returns_device(&factory).await,
    ));
    results.push(TestResult::from_result(
        "put_upserts_by_device_and_user",
        put_upserts_by_device_and_user(&factory).await,
    ));
    results.push(TestResult::from_result(
        "query_filters_by_user_and_device_ids",
        query_filters_by_user_and_device_ids(&factory).await,
    ));
    results.push(TestResult::from_result(
        "query_filters_deleted",
        query_filters_deleted(&factory).await,
    ));
    results.push(TestResult::from_result(
        "query_filters_disabled",
        query_filters_disabled(&factory).await,
    ));
    results.push(TestResult::from_result(
        "query_filters_platforms",
        query_filters_platforms(&factory).await,
    ));
    results.push(TestResult::from_result(
        "query_filters_endpoint_arns",
        query_filters_endpoint_arns(&factory).await,
    ));
    results.push(TestResult::from_result(
        "put_rejects_empty_token",
        put_rejects_empty_token(&factory).await,
    ));
    results.push(TestResult::from_result(
        "put_rejects_empty_device_id",
        put_rejects_empty_device_id(&factory).await,
    ));

    ConformanceReport { results }
}

async fn put_then_query_returns_device<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DeviceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let device = sample_device("d-1", 7);

    let stored = store
        .put(NS, device.clone())
        .await
        .map_err(|err| format!("put failed: {err}"))?;
    if stored != device {
        return Err("put did not return the stored record".to_string());
    }

    let found = store
        .query(NS, DeviceQueryOptions::default())
        .await
        .map_err(|err| format!("query failed: {err}"))?;
    if found != vec![device] {
        return Err(format!("expected the stored device, got {found:?}"));
    }
    Ok(())
}

async fn put_upserts_by_device_and_user<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DeviceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;

    store
        .put(NS, sample_device("d-1", 7))
        .await
        .map_err(|err| format!("first put failed: {err}"))?;

    let mut rotated = sample_device("d-1", 7);
    rotated.token = "rotated".to_string();
    store
        .put(NS, rotated.clone())
        .await
        .map_err(|err| format!("second put failed: {err}"))?;

    // Same device id under another user is a distinct record.
    store
        .put(NS, sample_device("d-1", 8))
        .await
        .map_err(|err| format!("third put failed: {err}"))?;

    let found = store
        .query(NS, DeviceQueryOptions::default())
        .await
        .map_err(|err| format!("query failed: {err}"))?;
    if found.len() != 2 {
        return Err(format!("expected 2 records, got {}", found.len()));
    }
    let same_key = found
        .iter()
        .find(|device| device.user_id == 7)
        .ok_or("record for user 7 missing")?;
    if same_key.token != rotated.token {
        return Err("upsert did not replace the existing record".to_string());
    }
    Ok(())
}

async fn query_filters_by_user_and_device_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DeviceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .put(NS, sample_device("d-1", 7))
        .await
        .map_err(|err| err.to_string())?;
    store
        .put(NS, sample_device("d-2", 7))
        .await
        .map_err(|err| err.to_string())?;
    store
        .put(NS, sample_device("d-1", 8))
        .await
        .map_err(|err| err.to_string())?;

    let found = store
        .query(
            NS,
            DeviceQueryOptions {
                device_ids: vec!["d-1".to_string()],
                user_ids: vec![7],
                ..Default::default()
            },
        )
        .await
        .map_err(|err| err.to_string())?;
    if found.len() != 1 || found[0].device_id != "d-1" || found[0].user_id != 7 {
        return Err(format!("expected exactly (d-1, 7), got {found:?}"));
    }
    Ok(())
}

async fn query_filters_deleted<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DeviceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut deleted = sample_device("d-1", 7);
    deleted.deleted = true;
    store
        .put(NS, deleted)
        .await
        .map_err(|err| err.to_string())?;
    store
        .put(NS, sample_device("d-2", 7))
        .await
        .map_err(|err| err.to_string())?;

    let found = store
        .query(
            NS,
            DeviceQueryOptions {
                deleted: Some(false),
                ..Default::default()
            },
        )
        .await
        .map_err(|err| err.to_string())?;
    if found.len() != 1 || found[0].device_id != "d-2" {
        return Err(format!("expected only the live device, got {found:?}"));
    }
    Ok(())
}

async fn query_filters_disabled<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DeviceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut disabled = sample_device("d-1", 7);
    disabled.disabled = true;
    store
        .put(NS, disabled)
        .await
        .map_err(|err| err.to_string())?;
    store
        .put(NS, sample_device("d-2", 7))
        .await
        .map_err(|err| err.to_string())?;

    let found = store
        .query(
            NS,
            DeviceQueryOptions {
                disabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .map_err(|err| err.to_string())?;
    if found.len() != 1 || found[0].device_id != "d-2" {
        return Err(format!("expected only the enabled device, got {found:?}"));
    }
    Ok(())
}

async fn query_filters_platforms<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DeviceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut android = sample_device("d-1", 7);
    android.platform = Platform::Android;
    store
        .put(NS, android)
        .await
        .map_err(|err| err.to_string())?;
    store
        .put(NS, sample_device("d-2", 7))
        .await
        .map_err(|err| err.to_string())?;

    let found = store
        .query(
            NS,
            DeviceQueryOptions {
                platforms: vec![Platform::Android],
                ..Default::default()
            },
        )
        .await
        .map_err(|err| err.to_string())?;
    if found.len() != 1 || found[0].platform != Platform::Android {
        return Err(format!("expected only the android device, got {found:?}"));
    }
    Ok(())
}

async fn query_filters_endpoint_arns<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DeviceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut registered = sample_device("d-1", 7);
    registered.endpoint_arn = Some("arn:one".to_string());
    store
        .put(NS, registered)
        .await
        .map_err(|err| err.to_string())?;
    store
        .put(NS, sample_device("d-2", 7))
        .await
        .map_err(|err| err.to_string())?;

    let found = store
        .query(
            NS,
            DeviceQueryOptions {
                endpoint_arns: vec!["arn:one".to_string()],
                ..Default::default()
            },
        )
        .await
        .map_err(|err| err.to_string())?;
    if found.len() != 1 || found[0].device_id != "d-1" {
        return Err(format!("expected only the registered device, got {found:?}"));
    }
    Ok(())
}

async fn put_rejects_empty_token<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DeviceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut device = sample_device("d-1", 7);
    device.token = String::new();

    match store.put(NS, device).await {
        Err(StoreError::InvalidDevice { .. }) => Ok(()),
        Err(other) => Err(format!("expected InvalidDevice, got {other}")),
        Ok(_) => Err("expected InvalidDevice, got Ok".to_string()),
    }
}

async fn put_rejects_empty_device_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DeviceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut device = sample_device("", 7);
    device.token = "token".to_string();

    match store.put(NS, device).await {
        Err(StoreError::InvalidDevice { .. }) => Ok(()),
        Err(other) => Err(format!("expected InvalidDevice, got {other}")),
        Ok(_) => Err("expected InvalidDevice, got Ok".to_string()),
    }
}
