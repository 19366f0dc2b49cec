//! In-memory doubles shared by unit tests

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::credentials::{Clock, Credential, CredentialProvider, RoleAssumer, RoleDescriptor};
use crate::error::{CredentialError, StoreError};
use crate::schema::{BoundInsert, ColumnValues, CompositeKey, CqlValue, Entity, EntitySchema, SchemaField, WriteOptions};
use crate::store::{ExecutionError, ExecutionResult, StoreConnection};

// ============================================================================
// Clock
// ============================================================================

#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Base provider whose credential can be swapped mid-test
#[derive(Debug)]
pub struct MutableProvider {
    credential: Mutex<Credential>,
}

impl MutableProvider {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential: Mutex::new(credential),
        }
    }

    pub fn set(&self, credential: Credential) {
        *self.credential.lock().unwrap() = credential;
    }
}

#[async_trait]
impl CredentialProvider for MutableProvider {
    async fn credentials(&self) -> Result<Credential, CredentialError> {
        Ok(self.credential.lock().unwrap().clone())
    }
}

#[derive(Debug, Clone)]
struct AssumeCall {
    role_arn: String,
    base_key: String,
    issued_key: Option<String>,
}

/// Identity provider issuing credentials valid for a fixed time from the
/// manual clock, recording every exchange.
#[derive(Debug)]
pub struct ScriptedAssumer {
    clock: Arc<ManualClock>,
    default_validity: Duration,
    validity: HashMap<String, Duration>,
    delay: Option<std::time::Duration>,
    failures: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<AssumeCall>>,
}

impl ScriptedAssumer {
    pub fn new(clock: Arc<ManualClock>, validity: Duration) -> Self {
        Self {
            clock,
            default_validity: validity,
            validity: HashMap::new(),
            delay: None,
            failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_validity(mut self, role_arn: &str, validity: Duration) -> Self {
        self.validity.insert(role_arn.to_string(), validity);
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_next(&self, message: &str) {
        self.failures.lock().unwrap().push_back(message.to_string());
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, role_arn: &str) -> usize {
        self.calls_matching(role_arn).len()
    }

    pub fn base_keys_for(&self, role_arn: &str) -> Vec<String> {
        self.calls_matching(role_arn)
            .into_iter()
            .map(|call| call.base_key)
            .collect()
    }

    pub fn issued_keys_for(&self, role_arn: &str) -> Vec<String> {
        self.calls_matching(role_arn)
            .into_iter()
            .filter_map(|call| call.issued_key)
            .collect()
    }

    fn calls_matching(&self, role_arn: &str) -> Vec<AssumeCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.role_arn == role_arn)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RoleAssumer for ScriptedAssumer {
    async fn assume_role(
        &self,
        base: &Credential,
        role: &RoleDescriptor,
    ) -> Result<Credential, CredentialError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failures.lock().unwrap().pop_front();
        let mut calls = self.calls.lock().unwrap();
        let sequence = calls.len();

        if let Some(message) = failure {
            calls.push(AssumeCall {
                role_arn: role.role_arn.clone(),
                base_key: base.access_key_id().to_string(),
                issued_key: None,
            });
            return Err(CredentialError::AssumeRole {
                role_arn: role.role_arn.clone(),
                message,
            });
        }

        let issued_key = format!("ASIA-{}-{}", role.session_name, sequence);
        calls.push(AssumeCall {
            role_arn: role.role_arn.clone(),
            base_key: base.access_key_id().to_string(),
            issued_key: Some(issued_key.clone()),
        });

        let validity = self
            .validity
            .get(&role.role_arn)
            .copied()
            .unwrap_or(self.default_validity);

        Ok(Credential::new(
            issued_key,
            format!("secret-{}", sequence),
            Some(format!("token-{}", sequence)),
            Some(self.clock.now() + validity),
        ))
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReadingKey {
    pub device_id: String,
    pub day: String,
}

impl CompositeKey for ReadingKey {
    fn fields() -> Vec<SchemaField> {
        vec![SchemaField::plain("device_id"), SchemaField::plain("day")]
    }

    fn write_values(&self, values: &mut ColumnValues) {
        values
            .set("device_id", CqlValue::Text(self.device_id.clone()))
            .set("day", CqlValue::Text(self.day.clone()));
    }
}

#[derive(Debug, Clone)]
pub struct SensorReading {
    pub key: ReadingKey,
    pub reading_time: i64,
    pub value: f64,
    pub unit: String,
}

impl SensorReading {
    pub fn new(device_id: &str, day: &str, reading_time: i64, value: f64) -> Self {
        Self {
            key: ReadingKey {
                device_id: device_id.to_string(),
                day: day.to_string(),
            },
            reading_time,
            value,
            unit: "celsius".to_string(),
        }
    }
}

impl Entity for SensorReading {
    fn schema() -> EntitySchema {
        EntitySchema::new("readings")
            .composite_key::<ReadingKey>("key")
            .column("reading_time")
            .column("value")
            .column("unit")
    }

    fn write_values(&self, values: &mut ColumnValues) {
        self.key.write_values(values);
        values
            .set("reading_time", CqlValue::BigInt(self.reading_time))
            .set("value", CqlValue::Double(self.value))
            .set("unit", CqlValue::Text(self.unit.clone()));
    }

    fn identity(&self) -> String {
        format!("{}/{}@{}", self.key.device_id, self.key.day, self.reading_time)
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStatement {
    pub id: usize,
    pub query: String,
    pub options: WriteOptions,
}

/// Store double: records prepares and executions, and answers with
/// scripted not-applied results or transport errors for chosen values.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    prepared: Mutex<Vec<String>>,
    prepare_failure: Mutex<Option<String>>,
    not_applied: Mutex<Vec<CqlValue>>,
    transport_failures: Mutex<Vec<CqlValue>>,
    executions: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<std::time::Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next prepare only
    pub fn fail_prepare(&self, message: &str) {
        *self.prepare_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn not_applied_when(&self, value: CqlValue) {
        self.not_applied.lock().unwrap().push(value);
    }

    pub fn transport_failure_when(&self, value: CqlValue) {
        self.transport_failures.lock().unwrap().push(value);
    }

    pub fn prepared_queries(&self) -> Vec<String> {
        self.prepared.lock().unwrap().clone()
    }

    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn matches(list: &Mutex<Vec<CqlValue>>, values: &[Option<CqlValue>]) -> bool {
        let list = list.lock().unwrap();
        values.iter().flatten().any(|value| list.contains(value))
    }
}

#[async_trait]
impl StoreConnection for InMemoryStore {
    type Prepared = MemoryStatement;

    async fn prepare(&self, query: &str, options: &WriteOptions) -> Result<MemoryStatement, StoreError> {
        if let Some(message) = self.prepare_failure.lock().unwrap().take() {
            return Err(StoreError::Prepare(message));
        }

        let mut prepared = self.prepared.lock().unwrap();
        prepared.push(query.to_string());
        Ok(MemoryStatement {
            id: prepared.len(),
            query: query.to_string(),
            options: options.clone(),
        })
    }

    async fn execute(
        &self,
        statement: &BoundInsert<MemoryStatement>,
    ) -> Result<ExecutionResult, StoreError> {
        assert_eq!(statement.values().len(), statement.statement().columns().len());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.executions.fetch_add(1, Ordering::SeqCst);

        if Self::matches(&self.transport_failures, statement.values()) {
            return Err(StoreError::Execute("connection reset".to_string()));
        }
        if Self::matches(&self.not_applied, statement.values()) {
            return Ok(ExecutionResult::not_applied(vec![ExecutionError::new(
                "coordinator",
                "row already exists",
            )]));
        }
        Ok(ExecutionResult::applied())
    }
}
