// tests/common/mod.rs
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use keeput_analyzer::clock::FixedClock;
use keeput_analyzer::fetch::SourceAggregator;
use keeput_analyzer::lock::LockCoordinator;
use keeput_analyzer::model::GoalEvaluator;
use keeput_analyzer::pipeline::ReportPipeline;
use keeput_analyzer::{
    AnalysisReport, Analyzer, Entry, EntryFetcher, Locker, Notifier, Persister, Platform, Printer,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

pub fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
}

pub fn entry(title: &str, published_at: DateTime<Utc>, platform: Platform) -> Entry {
    Entry {
        title: title.to_string(),
        body: format!("{title} body"),
        published_at,
        platform,
    }
}

pub fn utc_evaluator() -> GoalEvaluator {
    GoalEvaluator::new(FixedOffset::east_opt(0).unwrap())
}

// ---- fetchers ----

pub enum Script {
    Entry(Entry),
    Nothing,
    Fail(&'static str),
    Panic,
    /// Never resolves on its own.
    Hang,
    /// Waits for every fetcher sharing the barrier, then yields the entry.
    Rendezvous(Arc<Barrier>, Entry),
}

pub struct FakeFetcher {
    pub name: &'static str,
    pub script: Script,
    pub calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(name: &'static str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            name,
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EntryFetcher for FakeFetcher {
    async fn fetch_latest(&self, _cancel: &CancellationToken) -> Result<Option<Entry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Entry(e) => Ok(Some(e.clone())),
            Script::Nothing => Ok(None),
            Script::Fail(msg) => Err(anyhow!(*msg)),
            Script::Panic => panic!("fetcher {} blew up", self.name),
            Script::Hang => std::future::pending().await,
            Script::Rendezvous(b, e) => {
                b.wait().await;
                Ok(Some(e.clone()))
            }
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

pub fn aggregator(fetchers: &[Arc<FakeFetcher>]) -> SourceAggregator {
    SourceAggregator::new(
        fetchers
            .iter()
            .map(|f| f.clone() as Arc<dyn EntryFetcher>)
            .collect(),
    )
}

// ---- locker ----

#[derive(Clone, Copy)]
pub enum Acquire {
    Grant,
    Deny,
    Fail,
}

pub struct FakeLocker {
    pub answer: Acquire,
    pub acquired: Mutex<Vec<String>>,
    pub released: Mutex<Vec<String>>,
    pub fail_release: bool,
}

impl FakeLocker {
    pub fn new(answer: Acquire) -> Arc<Self> {
        Arc::new(Self {
            answer,
            acquired: Mutex::new(vec![]),
            released: Mutex::new(vec![]),
            fail_release: false,
        })
    }

    pub fn failing_release() -> Arc<Self> {
        Arc::new(Self {
            answer: Acquire::Grant,
            acquired: Mutex::new(vec![]),
            released: Mutex::new(vec![]),
            fail_release: true,
        })
    }

    pub fn releases(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Locker for FakeLocker {
    async fn acquire(&self, _cancel: &CancellationToken, lock_id: &str) -> Result<bool> {
        self.acquired.lock().unwrap().push(lock_id.to_string());
        match self.answer {
            Acquire::Grant => Ok(true),
            Acquire::Deny => Ok(false),
            Acquire::Fail => Err(anyhow!("lock service unreachable")),
        }
    }

    async fn release(&self, _cancel: &CancellationToken, lock_id: &str) -> Result<()> {
        self.released.lock().unwrap().push(lock_id.to_string());
        if self.fail_release {
            return Err(anyhow!("release rejected"));
        }
        Ok(())
    }
}

// ---- report sinks ----

#[derive(Default)]
pub struct Sink {
    pub fail: bool,
    pub panic: bool,
    pub reports: Mutex<Vec<AnalysisReport>>,
}

impl Sink {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            panic: true,
            ..Self::default()
        })
    }

    pub fn seen(&self) -> Vec<AnalysisReport> {
        self.reports.lock().unwrap().clone()
    }

    fn take(&self, report: &AnalysisReport) -> Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        if self.panic {
            panic!("sink panicked");
        }
        if self.fail {
            return Err(anyhow!("sink failed"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Persister for Sink {
    async fn persist(&self, _cancel: &CancellationToken, report: &AnalysisReport) -> Result<()> {
        self.take(report)
    }
}

impl Printer for Sink {
    fn print(&self, report: &AnalysisReport) -> Result<()> {
        self.take(report)
    }
}

#[async_trait::async_trait]
impl Notifier for Sink {
    async fn notify(&self, _cancel: &CancellationToken, report: &AnalysisReport) -> Result<()> {
        self.take(report)
    }

    fn name(&self) -> &'static str {
        "sink"
    }
}

pub struct Harness {
    pub locker: Arc<FakeLocker>,
    pub persister: Arc<Sink>,
    pub printer: Arc<Sink>,
    pub notifier: Arc<Sink>,
}

impl Harness {
    pub fn new(locker: Arc<FakeLocker>) -> Self {
        Self {
            locker,
            persister: Sink::ok(),
            printer: Sink::ok(),
            notifier: Sink::ok(),
        }
    }

    pub fn analyzer(&self, now: DateTime<Utc>, fetchers: &[Arc<FakeFetcher>]) -> Analyzer {
        let pipeline = ReportPipeline::new()
            .with_persister(self.persister.clone())
            .with_printer(self.printer.clone())
            .with_notifier(self.notifier.clone());
        Analyzer::new(
            Arc::new(FixedClock(now)),
            LockCoordinator::new(self.locker.clone()),
            aggregator(fetchers),
            pipeline,
        )
        .with_evaluator(utc_evaluator())
    }
}

/// Serves `app` on an ephemeral local port and returns its base url.
pub async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
