use crate::domain::call::RecordedCall;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallListing {
    pub total_calls: usize,
    pub calls: Vec<ListedCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListedCall {
    /// 1-based position in the recording.
    pub position: usize,
    pub method: String,
    pub output_arguments: Vec<String>,
    pub return_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSummary {
    pub total_calls: usize,
    pub methods: Vec<MethodSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodSummary {
    pub method: String,
    pub calls: usize,
}

impl CallListing {
    /// Calls whose method identity contains `filter`, keeping their original
    /// positions.
    pub fn from_recorded(calls: &[RecordedCall], filter: Option<&str>) -> Self {
        let listed = calls
            .iter()
            .enumerate()
            .map(|(i, call)| ListedCall {
                position: i + 1,
                method: call.method.to_string(),
                output_arguments: call.output_arguments.iter().map(ToString::to_string).collect(),
                return_value: call.return_value.to_string(),
            })
            .filter(|call| filter.is_none_or(|f| call.method.contains(f)))
            .collect();
        Self {
            total_calls: calls.len(),
            calls: listed,
        }
    }
}

impl CallSummary {
    pub fn from_recorded(calls: &[RecordedCall]) -> Self {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for call in calls {
            *counts.entry(call.method.to_string()).or_default() += 1;
        }
        let mut methods: Vec<MethodSummary> = counts
            .into_iter()
            .map(|(method, calls)| MethodSummary { method, calls })
            .collect();
        methods.sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.method.cmp(&b.method)));
        Self {
            total_calls: calls.len(),
            methods,
        }
    }
}
