//! Testing utilities for the xform workspace
//!
//! Scripted in-memory collaborators and reply fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use xform_core::{
    Collaborators, DocPassage, Manifest, ReasoningRequest, ReasoningService, ReasoningTask, Resolver,
    ResolverConfig, RetrievalService, SearchRequest, ServiceError,
};
use xform_ops::{FontCatalog, FontLookupError};

/// Reasoning service answering each task with a fixed reply
#[derive(Debug, Default)]
pub struct ScriptedReasoning {
    replies: HashMap<ReasoningTask, String>,
    failing: HashSet<ReasoningTask>,
    requests: Mutex<Vec<ReasoningRequest>>,
}

impl ScriptedReasoning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, task: ReasoningTask, reply: impl Into<String>) -> Self {
        self.replies.insert(task, reply.into());
        self
    }

    pub fn fail(mut self, task: ReasoningTask) -> Self {
        self.failing.insert(task);
        self
    }

    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, task: ReasoningTask) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.task == task).count()
    }

    pub fn prompt(&self, task: ReasoningTask) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.task == task)
            .map(|r| r.prompt.clone())
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoning {
    async fn complete(&self, request: ReasoningRequest) -> Result<String, ServiceError> {
        let task = request.task;
        self.requests.lock().unwrap().push(request);
        if self.failing.contains(&task) {
            return Err(ServiceError::new(format!("{task} backend unreachable")));
        }
        self.replies
            .get(&task)
            .cloned()
            .ok_or_else(|| ServiceError::new(format!("no scripted reply for {task}")))
    }
}

/// Retrieval service returning fixed passages
#[derive(Debug)]
pub struct StaticRetrieval {
    embedding: Vec<f32>,
    passages: Vec<DocPassage>,
    failing: bool,
    searches: Mutex<Vec<SearchRequest>>,
}

impl Default for StaticRetrieval {
    fn default() -> Self {
        Self {
            embedding: vec![0.6, 0.8],
            passages: Vec::new(),
            failing: false,
            searches: Mutex::new(Vec::new()),
        }
    }
}

impl StaticRetrieval {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_passages(passages: Vec<DocPassage>) -> Self {
        Self {
            passages,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetrievalService for StaticRetrieval {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ServiceError> {
        if self.failing {
            return Err(ServiceError::new("embedding backend unreachable"));
        }
        Ok(self.embedding.clone())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<DocPassage>, ServiceError> {
        self.searches.lock().unwrap().push(request.clone());
        if self.failing {
            return Err(ServiceError::new("search backend unreachable"));
        }
        Ok(self.passages.clone())
    }
}

/// Font catalog backed by a fixed set of paths
#[derive(Debug, Default)]
pub struct StaticFonts {
    known: HashSet<String>,
    unavailable: bool,
}

impl StaticFonts {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: paths.into_iter().map(Into::into).collect(),
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            known: HashSet::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl FontCatalog for StaticFonts {
    async fn font_exists(&self, path: &str) -> Result<bool, FontLookupError> {
        if self.unavailable {
            return Err(FontLookupError::new("font service unreachable"));
        }
        Ok(self.known.contains(path))
    }
}

pub fn passage(url: &str, score: f64, position: u64, content: &str) -> DocPassage {
    DocPassage {
        source_url: url.to_string(),
        page_title: format!("Docs: {url}"),
        page_description: String::new(),
        breadcrumb: vec!["Transformations".to_string()],
        summary: String::new(),
        content: content.to_string(),
        score,
        position,
    }
}

pub fn classification_reply(operations: &[&str], unresolved_intent: Option<&str>) -> String {
    json!({"operations": operations, "unresolved_intent": unresolved_intent}).to_string()
}

pub fn plan_reply(steps: &[(&str, Value)]) -> String {
    let steps: Vec<Value> = steps
        .iter()
        .map(|(operation, params)| json!({"operation": operation, "params": params}))
        .collect();
    json!({ "steps": steps }).to_string()
}

pub fn extraction_reply(params: Value) -> String {
    json!({ "params": params }).to_string()
}

pub fn resolver_with(
    config: ResolverConfig,
    reasoning: Arc<ScriptedReasoning>,
    retrieval: Arc<StaticRetrieval>,
    fonts: Arc<StaticFonts>,
) -> Resolver {
    let manifest = Manifest::builtin().unwrap().clone();
    Resolver::new(config, Arc::new(manifest), Collaborators::new(reasoning, retrieval, fonts))
}

pub fn resolver(reasoning: Arc<ScriptedReasoning>, retrieval: Arc<StaticRetrieval>) -> Resolver {
    resolver_with(
        ResolverConfig::new(),
        reasoning,
        retrieval,
        Arc::new(StaticFonts::default()),
    )
}
